use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::AppConfig;

pub mod models;
pub mod update_builder;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/tinymagiq";

/// Build the shared connection pool from DATABASE_URL and pool settings
/// in config. The pool connects lazily; the first query establishes the
/// actual connection, so startup succeeds even while the database is
/// still coming up.
pub fn connect_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
        .connect_lazy(&url)
}

/// True when the error is a Postgres unique-constraint violation
/// (SQLSTATE 23505). Duplicate membership rows and duplicate names are
/// detected this way rather than by pre-checking.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
