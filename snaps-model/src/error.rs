// SPDX-License-Identifier: GPL-3.0-only

use snaps_sys::SysError;
use thiserror::Error;

/// Error types for model and engine operations
#[derive(Error, Debug)]
pub enum ModelError {
    /// Fatal; aborts the whole session.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An external operation failed; aborts only the in-progress
    /// action, sibling actions are still attempted.
    #[error(transparent)]
    Command(#[from] SysError),

    /// Malformed snapshot suffix; recoverable, re-prompt.
    #[error("invalid snapshot suffix: {0}")]
    Validation(String),

    /// Refusal to mutate a mounted subvolume or a subtree holding one.
    #[error("cannot delete {path}: mounted at {mount}")]
    MountConflict { path: String, mount: String },

    /// Refusal to snapshot an ineligible subvolume.
    #[error("cannot snapshot {path}: {reason}")]
    SnapshotRefused { path: String, reason: &'static str },

    /// Reboot refused: kernel modules, boot entries and the boot
    /// backup have no version in common.
    #[error(
        "not bootable; modules: [{}] boot entries: [{}] backups: [{}]",
        .modules.join(" "),
        .entries.join(" "),
        .backups.join(" ")
    )]
    Bootability {
        modules: Vec<String>,
        entries: Vec<String>,
        backups: Vec<String>,
    },
}

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
