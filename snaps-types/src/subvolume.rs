// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index of a subvolume within its device arena.
///
/// All cross-references between subvolumes (parent, children, snapshot
/// origin) are arena indices, valid until the next rebuild.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SubvolId(pub usize);

/// One subvolume of a BTRFS filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subvolume {
    /// Basename of the device holding this subvolume.
    pub device: String,

    /// Absolute path within the filesystem, always with a leading `/`.
    pub path: String,

    /// Filesystem-assigned subvolume id.
    pub ident: u64,

    /// Filesystem-assigned id of the parent subvolume.
    pub parent_ident: u64,

    /// Nesting depth; top-level subvolumes sit at 0.
    pub depth: u32,

    /// Current mount point, `None` when unmounted.
    pub mount: Option<String>,

    /// Exclusive size in bytes; populated lazily by the usage query and
    /// carried across rebuilds as a cache.
    pub size: Option<u64>,

    /// Owned children, in discovery order.
    pub children: Vec<SubvolId>,

    /// Back-reference to the parent subvolume.
    pub parent: Option<SubvolId>,

    /// Back-reference to the subvolume this one is a snapshot of.
    /// `None` when this is not a snapshot (or its origin is unresolved).
    pub origin: Option<SubvolId>,

    /// Inferred snapshot label, e.g. `=Daily`; empty when unlabeled.
    pub label: String,

    /// Snapshots of this subvolume, kept sorted by path.
    pub snaps: Vec<SubvolId>,

    /// Snapshots of this subvolume grouped by label, each group kept
    /// sorted by path (paths embed creation timestamps).
    pub label_groups: BTreeMap<String, Vec<SubvolId>>,

    /// Compact age of the timestamp embedded in the path, e.g. `3d4h`.
    pub ago: String,
}

impl Subvolume {
    pub fn new(device: &str, path: &str, ident: u64, parent_ident: u64) -> Self {
        Self {
            device: device.to_string(),
            path: path.to_string(),
            ident,
            parent_ident,
            depth: 0,
            mount: None,
            size: None,
            children: Vec::new(),
            parent: None,
            origin: None,
            label: String::new(),
            snaps: Vec::new(),
            label_groups: BTreeMap::new(),
            ago: String::new(),
        }
    }

    /// Last path component.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    pub fn is_snapshot(&self) -> bool {
        self.origin.is_some()
    }
}
