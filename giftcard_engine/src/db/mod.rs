//! Order store backends.
//!
//! [`SqliteDatabase`](sqlite::SqliteDatabase) is the durable backend used by the server. [`InMemoryOrderStore`] keeps
//! everything in a shared map and is used for tests and throwaway runs.
pub(crate) mod common;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
