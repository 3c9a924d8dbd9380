//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{format_bytes, is_document_file, preview, sanitize_filename, upload_file_name};
pub use retry::{RetryPolicy, Retryable, with_retry};
