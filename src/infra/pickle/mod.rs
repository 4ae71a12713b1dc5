// Implementations of the pickle store.

#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

#[cfg(test)]
pub use in_memory::InMemoryPickleStore;
pub use sqlite_store::SqlitePickleStore;
