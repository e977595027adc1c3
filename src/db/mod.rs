use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

/// Creates the pool. Every connection gets a server-side `statement_timeout`,
/// so a statement that overruns it is aborted by Postgres and never commits.
pub async fn create_pool(
    database_url: &Secret<String>,
    max_connections: u32,
    statement_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let set_timeout = statement_timeout_sql(statement_timeout);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .after_connect(move |conn, _meta| {
            let set_timeout = set_timeout.clone();
            Box::pin(async move {
                conn.execute(set_timeout.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url.expose_secret())
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

fn statement_timeout_sql(timeout: Duration) -> String {
    // 0 would disable the timeout altogether
    format!("SET statement_timeout = {}", timeout.as_millis().max(1))
}
