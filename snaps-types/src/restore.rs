// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// One step of a planned recovery sequence.
///
/// Actions are keyed by consecutive single characters starting at `a`;
/// `next` is the key conventionally preselected once this action ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreAction {
    pub key: char,

    /// Human-readable description shown by the picker.
    pub description: String,

    /// Literal shell command line this action stands for.
    pub command: String,

    pub next: char,
}

impl RestoreAction {
    pub fn new(key: char, description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            key,
            description: description.into(),
            command: command.into(),
            next: crate::prompt::next_key(key),
        }
    }
}
