// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, Local};
use snaps_sys::SubvolRecord;
use snaps_types::{Device, Subvolume, ago_whence};

use crate::tree::DeviceTree;

/// Build one device's forest from flat `btrfs subvolume list` records.
///
/// Records arrive in filesystem id order, so a parent is always listed
/// before its children; a record whose parent id is absent from the
/// set seen so far becomes a depth-0 root.
pub fn build_tree(device: Device, records: &[SubvolRecord], now: DateTime<Local>) -> DeviceTree {
    let mut tree = DeviceTree::new(device);
    for record in records {
        let path = format!("/{}", record.path);
        let mut subvol = Subvolume::new(&tree.device.name, &path, record.id, record.parent_id);
        subvol.ago = ago_whence(&path, now);
        tree.insert(subvol);
    }
    tree
}
