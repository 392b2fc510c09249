// SPDX-License-Identifier: GPL-3.0-only

//! Shared data types for the btrfs-snaps tools
//!
//! Plain data carried between the command boundary, the subvolume model
//! and the CLI front ends. No I/O happens in this crate.

pub mod device;
pub mod prompt;
pub mod restore;
pub mod subvolume;
pub mod units;

pub use device::{Device, SpaceSummary};
pub use prompt::{Choice, Picker, Prompt, next_key};
pub use restore::RestoreAction;
pub use subvolume::{SubvolId, Subvolume};
pub use units::{ago_str, ago_whence, human, parse_human, timestamp_str};
