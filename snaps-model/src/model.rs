// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Local};
use serde::Serialize;
use snaps_sys::{DuEntry, MountEntry, SubvolRecord};
use snaps_types::{Device, SubvolId, Subvolume};

use crate::correlate::apply_mounts;
use crate::discovery::build_tree;
use crate::error::Result;
use crate::snapshots::infer_snapshots;
use crate::tree::DeviceTree;

/// The read model: every device forest plus what the correlator and
/// inferencer derived from it.
///
/// Rebuilt wholesale whenever `dirty` is set; only `size` values are
/// carried over, keyed by `(device, path)`.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub trees: BTreeMap<String, DeviceTree>,
    /// Device and arena id of the subvolume mounted at `/.snapshots`.
    pub snaproot: (String, SubvolId),
    /// Rotation targets, in deterministic order.
    pub snap_targets: Vec<(String, SubvolId)>,
    /// Labels seen on resolved snapshots.
    pub labels: BTreeSet<String>,
    /// Set by mutations; the next read must rebuild the model.
    pub dirty: bool,
}

impl Model {
    /// Run Discovery, the mount correlator and the relationship
    /// inferencer over captured inputs.
    pub fn build(
        inputs: Vec<(Device, Vec<SubvolRecord>)>,
        mounts: &[MountEntry],
        now: DateTime<Local>,
    ) -> Result<Self> {
        let mut trees = BTreeMap::new();
        for (device, records) in inputs {
            let name = device.name.clone();
            trees.insert(name, build_tree(device, &records, now));
        }
        let correlation = apply_mounts(&mut trees, mounts)?;
        let labels = infer_snapshots(&mut trees, &correlation.snaproot);
        Ok(Self {
            trees,
            snaproot: correlation.snaproot,
            snap_targets: correlation.snap_targets,
            labels,
            dirty: false,
        })
    }

    pub fn tree(&self, device: &str) -> &DeviceTree {
        &self.trees[device]
    }

    pub fn subvol(&self, device: &str, id: SubvolId) -> &Subvolume {
        self.trees[device].get(id)
    }

    pub fn snaproot_subvol(&self) -> &Subvolume {
        self.subvol(&self.snaproot.0, self.snaproot.1)
    }

    /// Cached sizes, keyed for carry-over across rebuilds.
    pub fn sizes(&self) -> BTreeMap<(String, String), u64> {
        let mut sizes = BTreeMap::new();
        for tree in self.trees.values() {
            for id in tree.ids() {
                let subvol = tree.get(id);
                if let Some(size) = subvol.size {
                    sizes.insert((subvol.device.clone(), subvol.path.clone()), size);
                }
            }
        }
        sizes
    }

    /// Re-apply sizes captured from the previous model generation.
    pub fn restore_sizes(&mut self, sizes: &BTreeMap<(String, String), u64>) {
        for tree in self.trees.values_mut() {
            for id in tree.ids().collect::<Vec<_>>() {
                let key = {
                    let subvol = tree.get(id);
                    (subvol.device.clone(), subvol.path.clone())
                };
                if let Some(&size) = sizes.get(&key) {
                    tree.get_mut(id).size = Some(size);
                }
            }
        }
    }

    /// Fold `btrfs filesystem du` rows into the model: a snapshot gets
    /// its exclusive size, its origin the largest total seen.
    pub fn apply_usage(&mut self, device: &str, entries: &[DuEntry]) {
        let Some(tree) = self.trees.get_mut(device) else {
            return;
        };
        for entry in entries {
            let path = format!("/{}", entry.path);
            let Some(&id) = tree.by_path.get(&path) else {
                continue;
            };
            tree.get_mut(id).size = Some(entry.exclusive_bytes);
            if let Some(origin) = tree.get(id).origin {
                let best = tree.get(origin).size.unwrap_or(0).max(entry.total_bytes);
                tree.get_mut(origin).size = Some(best);
            }
        }
    }
}
