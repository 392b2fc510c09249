// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a picker displays for one key.
///
/// The core only builds key→prompt maps and interprets the returned
/// key; rendering belongs to the picker implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Short text shown next to the key.
    pub text: String,

    /// Optional extended, possibly multi-line text.
    pub extra: Option<String>,

    /// Optional opaque payload, typically the command the choice
    /// stands for.
    pub payload: Option<String>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// Key selected by the operator plus the conventional follow-up key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub key: char,
    pub next: char,
}

/// The conventional key to preselect after `key` ran.
pub fn next_key(key: char) -> char {
    char::from((key as u8).wrapping_add(1))
}

/// Interactive collaborator presenting choices to an operator.
pub trait Picker {
    /// Display `prompts` under `title` and block until one key is
    /// selected; `preselect` is offered as the default.
    fn pick(
        &mut self,
        title: &str,
        prompts: &BTreeMap<char, Prompt>,
        preselect: Option<char>,
    ) -> std::io::Result<Choice>;

    /// Ask a free-form question seeded with an editable default.
    /// Returns `None` when the operator clears the answer.
    fn answer(&mut self, question: &str, seed: &str) -> std::io::Result<Option<String>>;

    /// Yes/no confirmation.
    fn confirm(&mut self, question: &str) -> std::io::Result<bool>;

    /// One-way notification, e.g. a refused operation.
    fn alert(&mut self, title: &str, message: &str);
}
