//! Error types for netsentry.

use thiserror::Error;

/// Failure of a platform port operation.
///
/// Adapters convert every underlying failure into one of these variants;
/// nothing below the port boundary panics or propagates raw I/O errors into
/// the monitoring core.
#[derive(Error, Debug)]
pub enum PortError {
    #[error("command failed: {0}")]
    Command(String),

    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("unparsable output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
