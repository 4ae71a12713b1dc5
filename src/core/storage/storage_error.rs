use thiserror::Error;

/// A persistence failure that survived the retry wrapper.
///
/// The command layer turns any of these into the same apology message; the variants
/// exist so logs can tell a busy database apart from a broken query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("transient storage conflict persisted after {attempts} attempts: {message}")]
    TransientConflict { attempts: u32, message: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}
