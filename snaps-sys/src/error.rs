// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("cannot parse {what}: {line:?}")]
    ParseFailed { what: &'static str, line: String },

    #[error("cannot mount {device} at {target}: {detail}")]
    MountFailed {
        device: String,
        target: String,
        detail: String,
    },

    #[error("required tool not found: {0}")]
    ToolMissing(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
