pub mod adapter;
pub mod error;
pub mod schema;

pub use adapter::SqliteStorageAdapter;
pub use error::{Result, StorageError};
pub use schema::{init_storage_db, init_test_db};
