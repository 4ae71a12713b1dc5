// Storage primitives shared by every store implementation.
// The core only knows about failure *classes* and the retry rules; the infra layer
// decides which concrete driver errors fall into which class.

pub mod retry_policy;
pub mod storage_error;

pub use retry_policy::{FailureClass, RetryDecision, RetryPolicy, RetryState};
pub use storage_error::StorageError;
