// SPDX-License-Identifier: GPL-3.0-only

//! Mutation primitives: snapshot creation and bottom-up deletion.
//! Both mark the model dirty so the next read rebuilds it.

use snaps_sys::Executor;
use snaps_types::SubvolId;

use crate::correlate::SNAPSHOT_MOUNT;
use crate::error::{ModelError, Result};
use crate::model::Model;

/// Evidence that the operator approved a deletion. Constructed by the
/// interactive layer after a confirmation prompt, or directly by the
/// rotation engine, which deletes on the operator's explicit request.
#[derive(Debug, Clone, Copy)]
pub struct Confirmed;

/// Create a read-only snapshot of a live mount under the snapshots
/// root, named `<origin-path><suffix>`.
pub fn create_snapshot(
    model: &mut Model,
    executor: &Executor,
    device: &str,
    id: SubvolId,
    suffix: &str,
) -> Result<()> {
    let subvol = model.subvol(device, id);
    if subvol.is_snapshot() {
        return Err(ModelError::SnapshotRefused {
            path: subvol.path.clone(),
            reason: "cannot snapshot a snapshot",
        });
    }
    let Some(mount) = subvol.mount.clone() else {
        return Err(ModelError::SnapshotRefused {
            path: subvol.path.clone(),
            reason: "subvolume is not mounted",
        });
    };
    if mount == SNAPSHOT_MOUNT {
        return Err(ModelError::SnapshotRefused {
            path: subvol.path.clone(),
            reason: "refusing to snapshot the snapshots root",
        });
    }

    let dest = format!(
        "{}{}{}{}",
        model.tree(device).device.scratch.display(),
        model.snaproot_subvol().path,
        subvol.path,
        suffix
    );
    executor.run(&format!("btrfs sub snap -r {mount} {dest}"))?;
    model.dirty = true;
    Ok(())
}

/// Delete a subvolume and its whole subtree, descendants first.
///
/// Refuses before the first deletion when any node of the subtree is
/// mounted. A failing step aborts the remaining steps; the model is
/// dirty as soon as at least one deletion went through.
pub fn delete_subvolume(
    model: &mut Model,
    executor: &Executor,
    device: &str,
    id: SubvolId,
    _approved: Confirmed,
) -> Result<()> {
    let order = model.tree(device).bottom_up(id);

    for &node in &order {
        let subvol = model.subvol(device, node);
        if let Some(mount) = &subvol.mount {
            return Err(ModelError::MountConflict {
                path: subvol.path.clone(),
                mount: mount.clone(),
            });
        }
    }

    let scratch = model.tree(device).device.scratch.clone();
    for node in order {
        let target = format!("{}{}", scratch.display(), model.subvol(device, node).path);
        executor.run(&format!("btrfs sub del {target}"))?;
        model.dirty = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn executor() -> Executor {
        Executor::new(true)
    }

    #[test]
    fn create_refuses_snapshot_sources() {
        let mut model = fixtures::model();
        let snap = model.tree("sda2").by_path["/eos@snapshots/eos@root.2024-01-10-174732=Daily"];
        let error =
            create_snapshot(&mut model, &executor(), "sda2", snap, ".2024-02-01-000000").unwrap_err();
        assert!(matches!(error, ModelError::SnapshotRefused { .. }));
        assert!(!model.dirty);
    }

    #[test]
    fn create_refuses_the_snapshots_root() {
        let mut model = fixtures::model();
        let snaproot = model.snaproot.1;
        let error = create_snapshot(&mut model, &executor(), "sda2", snaproot, ".2024-02-01-000000")
            .unwrap_err();
        assert!(matches!(error, ModelError::SnapshotRefused { .. }));
    }

    #[test]
    fn create_marks_dirty_on_success() {
        let mut model = fixtures::model();
        let root = model.tree("sda2").by_path["/eos@root"];
        create_snapshot(&mut model, &executor(), "sda2", root, ".2024-02-01-000000=Daily")
            .unwrap();
        assert!(model.dirty);
    }

    #[test]
    fn delete_refuses_mounted_subtrees_before_acting() {
        let mut model = fixtures::model();
        let root = model.tree("sda2").by_path["/eos@root"];
        let error =
            delete_subvolume(&mut model, &executor(), "sda2", root, Confirmed).unwrap_err();
        match error {
            ModelError::MountConflict { path, mount } => {
                assert_eq!(path, "/eos@root");
                assert_eq!(mount, "/");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!model.dirty);
    }

    #[test]
    fn delete_refuses_when_a_descendant_is_mounted() {
        use snaps_sys::parse_mounts;

        let records = vec![
            fixtures::record(318, 5, "eos@root"),
            fixtures::record(320, 5, "eos@stuff"),
            fixtures::record(321, 320, "eos@stuff/cache"),
            fixtures::record(699, 5, "eos@snapshots"),
        ];
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n\
             /dev/sda2 /var/cache btrfs rw,subvolid=321 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(fixtures::device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();

        // eos@stuff itself is unmounted; its child pins the subtree
        let stuff = model.tree("sda2").by_path["/eos@stuff"];
        let error =
            delete_subvolume(&mut model, &executor(), "sda2", stuff, Confirmed).unwrap_err();
        match error {
            ModelError::MountConflict { path, mount } => {
                assert_eq!(path, "/eos@stuff/cache");
                assert_eq!(mount, "/var/cache");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!model.dirty);
    }

    #[test]
    fn delete_of_unmounted_snapshot_marks_dirty() {
        let mut model = fixtures::model();
        let snap = model.tree("sda2").by_path["/eos@snapshots/eos@home.2024-01-12-084102=Daily"];
        delete_subvolume(&mut model, &executor(), "sda2", snap, Confirmed).unwrap();
        assert!(model.dirty);
    }
}
