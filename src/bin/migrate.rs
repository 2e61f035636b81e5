use std::{env, time::Duration};

use anyhow::Context;
use petcare_api::db::{create_orm_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let orm = create_orm_conn(&database_url, Duration::from_secs(10)).await?;
    run_migrations(&orm).await?;
    println!("Migrations applied");
    Ok(())
}
