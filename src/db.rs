use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sqlx::migrate::Migrator;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a SeaORM connection whose pool gives up after `timeout`.
pub async fn create_orm_conn(database_url: &str, timeout: Duration) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply the SQL files in `migrations/` through the connection's sqlx pool.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    MIGRATOR.run(conn.get_postgres_connection_pool()).await?;
    Ok(())
}
