//! Utility modules for plantdoc-dx

pub mod retry;
pub mod text;

pub use retry::{retry_transient, RetryPolicy, Transient};
