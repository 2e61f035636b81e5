use std::{env, time::Duration};

use anyhow::{Context, bail};
use chrono::Utc;
use petcare_api::{
    db::create_orm_conn,
    models::{Role, collections::USERS},
    store::{DocumentStore, Filter, PgDocumentStore, Query, fields},
};
use serde_json::json;

/// Promote the user registered with the given phone number to admin.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let Some(phone) = env::args().nth(1) else {
        bail!("usage: set_admin <phone-number>");
    };
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let timeout = Duration::from_secs(10);
    let store = PgDocumentStore::new(create_orm_conn(&database_url, timeout).await?, timeout);

    let users = store
        .query(&Query::collection(USERS).filter(Filter::eq("phoneNumber", phone.as_str())))
        .await?;
    let Some(user) = users.first() else {
        bail!("no user with phone number {phone}; they must sign in once first");
    };

    let patch = fields(json!({ "role": Role::Admin, "updatedAt": Utc::now() }));
    store.update(USERS, &user.id, patch).await?;
    println!("User {} is now an admin", user.id);
    Ok(())
}
