//! Shared error type for conditions that are genuinely exceptional rather
//! than ordinary compile failures (which flow through [`crate::diag`] as
//! data, never as `Err`, per spec.md §7's "no exceptions cross pass
//! boundaries").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtilError {
    #[error("failed to read source file {path}: {source}")]
    ReadSource {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, UtilError>;
