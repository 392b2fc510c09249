// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use snaps_sys::MountEntry;
use snaps_types::SubvolId;

use crate::error::{ModelError, Result};
use crate::tree::DeviceTree;

/// Fixed mount point of the snapshots root.
pub const SNAPSHOT_MOUNT: &str = "/.snapshots";

/// Sorts unmounted top-level subvolumes after every mounted one.
const UNMOUNTED_SENTINEL: &str = "/~~~~~~~~~~~~";

/// What the mount correlator learned about the forests.
#[derive(Debug, Clone)]
pub struct Correlation {
    /// Device and arena id of the subvolume mounted at `/.snapshots`.
    pub snaproot: (String, SubvolId),
    /// Top-level mounted subvolumes excluding the snapshots root, in
    /// `(mountpoint-or-sentinel, path)` order; what rotation targets.
    pub snap_targets: Vec<(String, SubvolId)>,
}

/// The filesystem hosting `/` must be btrfs; anything else is fatal.
pub fn ensure_root_is_btrfs(mounts: &[MountEntry]) -> Result<()> {
    for entry in mounts {
        if entry.mount_point == "/" && entry.fs_type != "btrfs" {
            return Err(ModelError::Precondition(format!(
                "root filesystem is {}, expected btrfs",
                entry.fs_type
            )));
        }
    }
    Ok(())
}

/// Attach live mount points to subvolumes by `subvolid=`, locate the
/// snapshots root, order each forest and compute the rotation targets.
pub fn apply_mounts(
    trees: &mut BTreeMap<String, DeviceTree>,
    mounts: &[MountEntry],
) -> Result<Correlation> {
    ensure_root_is_btrfs(mounts)?;

    let mut snaproot = None;
    for entry in mounts {
        if entry.fs_type != "btrfs" {
            continue;
        }
        let Some(ident) = entry.subvol_id() else {
            continue;
        };
        for (device, tree) in trees.iter_mut() {
            if let Some(&id) = tree.by_ident.get(&ident) {
                tree.get_mut(id).mount = Some(entry.mount_point.clone());
                if entry.mount_point == SNAPSHOT_MOUNT {
                    snaproot = Some((device.clone(), id));
                }
                break;
            }
        }
    }

    let Some(snaproot) = snaproot else {
        return Err(ModelError::Precondition(format!(
            "cannot find a subvolume mounted at {SNAPSHOT_MOUNT}"
        )));
    };

    for tree in trees.values_mut() {
        tree.sort_roots_by(|subvol| {
            (
                subvol
                    .mount
                    .clone()
                    .unwrap_or_else(|| UNMOUNTED_SENTINEL.to_string()),
                subvol.path.clone(),
            )
        });
    }

    let mut snap_targets = Vec::new();
    for (device, tree) in trees.iter() {
        for &root in &tree.roots {
            let subvol = tree.get(root);
            if (device.as_str(), root) != (snaproot.0.as_str(), snaproot.1)
                && subvol.depth == 0
                && subvol.is_mounted()
            {
                snap_targets.push((device.clone(), root));
            }
        }
    }

    Ok(Correlation {
        snaproot,
        snap_targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use snaps_types::Device;
    use snaps_sys::{SubvolRecord, parse_mounts};
    use std::path::PathBuf;

    use crate::discovery::build_tree;

    fn record(id: u64, parent_id: u64, path: &str) -> SubvolRecord {
        SubvolRecord {
            id,
            parent_id,
            path: path.to_string(),
        }
    }

    fn trees() -> BTreeMap<String, DeviceTree> {
        let device = Device {
            name: "mmcblk1p2".to_string(),
            scratch: PathBuf::from("/tmp/.btrfs/mmcblk1p2"),
            space: None,
        };
        let records = vec![
            record(318, 5, "eos@root"),
            record(319, 5, "eos@home"),
            record(320, 5, "eos@unmounted"),
            record(699, 5, "eos@snapshots"),
        ];
        let now = Local.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap();
        let mut trees = BTreeMap::new();
        trees.insert(
            "mmcblk1p2".to_string(),
            build_tree(device, &records, now),
        );
        trees
    }

    const MOUNTS: &str = "\
/dev/mmcblk1p2 / btrfs rw,subvolid=318,subvol=/eos@root 0 0
/dev/mmcblk1p2 /home btrfs rw,subvolid=319,subvol=/eos@home 0 0
/dev/mmcblk1p2 /.snapshots btrfs rw,subvolid=699,subvol=/eos@snapshots 0 0
";

    #[test]
    fn finds_snaproot_and_orders_targets() {
        let mut trees = trees();
        let correlation = apply_mounts(&mut trees, &parse_mounts(MOUNTS)).unwrap();

        let tree = &trees["mmcblk1p2"];
        let (snap_dev, snap_id) = &correlation.snaproot;
        assert_eq!(snap_dev, "mmcblk1p2");
        assert_eq!(tree.get(*snap_id).path, "/eos@snapshots");

        // mounted targets sort by mount point; the snapshots root and
        // the unmounted top-level are excluded
        let target_paths: Vec<&str> = correlation
            .snap_targets
            .iter()
            .map(|(_, id)| tree.get(*id).path.as_str())
            .collect();
        assert_eq!(target_paths, ["/eos@root", "/eos@home"]);

        // unmounted roots sort after all mounted ones
        let root_paths: Vec<&str> = tree
            .roots
            .iter()
            .map(|id| tree.get(*id).path.as_str())
            .collect();
        assert_eq!(
            root_paths,
            ["/eos@root", "/eos@snapshots", "/eos@home", "/eos@unmounted"]
        );
    }

    #[test]
    fn missing_snaproot_is_fatal() {
        let mut trees = trees();
        let mounts = parse_mounts("/dev/mmcblk1p2 / btrfs rw,subvolid=318 0 0\n");
        let error = apply_mounts(&mut trees, &mounts).unwrap_err();
        assert!(matches!(error, ModelError::Precondition(_)));
    }

    #[test]
    fn non_btrfs_root_is_fatal() {
        let mut trees = trees();
        let mounts = parse_mounts("/dev/sda1 / ext4 rw 0 0\n");
        let error = apply_mounts(&mut trees, &mounts).unwrap_err();
        assert!(matches!(error, ModelError::Precondition(_)));
    }
}
