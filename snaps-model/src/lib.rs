// SPDX-License-Identifier: GPL-3.0-only

//! Subvolume model, rotation engine and restore planner
//!
//! The read model is rebuilt wholesale from the command boundary:
//! Discovery builds per-device forests from flat records, the mount
//! correlator attaches live mount points and locates the snapshots
//! root, and the relationship inferencer classifies snapshots by
//! naming convention. Rotation, the mutation primitives and the
//! restore planner consume that model; mutations mark it dirty so the
//! next read rebuilds it (only cached sizes survive a rebuild).

pub mod correlate;
pub mod discovery;
pub mod error;
pub mod model;
pub mod mutate;
pub mod restore;
pub mod rotation;
pub mod session;
pub mod snapshots;
pub mod tree;

pub use correlate::SNAPSHOT_MOUNT;
pub use error::{ModelError, Result};
pub use model::Model;
pub use mutate::Confirmed;
pub use rotation::{ADD_CEILING, RotationMode, rotate, validate_suffix};
pub use session::Session;
pub use tree::DeviceTree;
