//! # SQLite order store
//!
//! Low-level queries live in [`orders`] as plain functions that accept a `&mut SqliteConnection`, so callers can run
//! them on a pooled connection or inside a transaction without any other changes. [`SqliteDatabase`] wires them up
//! to the [`OrderStore`](crate::traits::OrderStore) contract.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod orders;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/giftcards.db";

pub fn db_url() -> String {
    let result = env::var("GCM_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ GCM_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
