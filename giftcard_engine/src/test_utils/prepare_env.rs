use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh, migrated SQLite database at `url`, dropping any existing one.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🗃️ Error dropping database {url}: {e:?}");
        }
    }
    SqliteDatabase::create_and_migrate(url, 5).await.expect("Error creating test database")
}

/// A database URL in the system temp directory that no other test is using
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("gcm_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn tear_down(mut db: SqliteDatabase) {
    use crate::OrderStore;
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🗃️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🗃️ Failed to drop database {url}: {e}");
    }
}
