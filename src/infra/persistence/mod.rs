pub mod sqlite_client;

pub use sqlite_client::{SqlValue, SqliteClient};
