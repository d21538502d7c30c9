pub mod models;
pub mod test_utils;
pub mod token_store;

pub use sea_orm::{DatabaseConnection, DbErr};

use migration::Migrator;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use util::config;

/// Connects to the configured database and brings the schema up to date.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let url = database_url(&config::database_path());
    let db = Database::connect(&url).await?;
    Migrator::up(&db, None).await?;
    tracing::info!(%url, "Database ready");
    Ok(db)
}

fn database_url(path_or_url: &str) -> String {
    // If it's already a DSN, use it as-is; otherwise treat it as a SQLite file path.
    if path_or_url.starts_with("sqlite:") {
        return path_or_url.to_owned();
    }

    // SQLite won't create intermediate dirs.
    if let Some(parent) = Path::new(path_or_url).parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            tracing::warn!(dir = %parent.display(), error = %err, "Could not create database directory");
        }
    }
    format!("sqlite://{path_or_url}?mode=rwc")
}
