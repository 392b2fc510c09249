// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeMap, BTreeSet};

use snaps_sys::{Executor, MountEntry, SubvolRecord};

/// Name suffix of a former-live subvolume parked after a restore.
pub const REVERTED_SUFFIX: &str = "=Reverted";

/// Name suffix of a subvolume renamed for deferred deletion because it
/// was mounted when it had to go.
pub const TODEL_SUFFIX: &str = "ToDel";

/// One restore source: a snapshot or revert-marker path, plus whether
/// it carries a captured boot backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapSource {
    /// Path relative to the filesystem root, as listed.
    pub path: String,
    pub has_boot_backup: bool,
}

/// Everything restorable for one top-level name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestoreEntry {
    /// Prior revert target parked under a dated `=Reverted` suffix.
    pub revert: Option<SnapSource>,
    /// Snapshots of this name, oldest first.
    pub snaps: Vec<SnapSource>,
}

/// The simplified top-level view the restore planner works from.
#[derive(Debug, Clone, Default)]
pub struct RestoreState {
    pub entries: BTreeMap<String, RestoreEntry>,
    /// Relative paths of currently mounted subvolumes.
    pub mounted: BTreeSet<String>,
    /// Relative path of the subvolume mounted at `/`, when known.
    pub root_subvol: Option<String>,
}

/// What `/proc/mounts` says before any scan.
#[derive(Debug, Clone, Default)]
pub struct MountedInfo {
    /// Filesystem-assigned ids of every mounted btrfs subvolume.
    pub ids: BTreeSet<u64>,
    /// Relative path of the subvolume mounted at `/`.
    pub root_subvol: Option<String>,
    /// Device currently occupying `/mnt`, whatever its type.
    pub mnt_device: Option<String>,
}

pub fn mounted_info(mounts: &[MountEntry]) -> MountedInfo {
    let mut info = MountedInfo::default();
    for entry in mounts {
        if entry.mount_point == "/mnt" {
            info.mnt_device = Some(entry.device.clone());
        }
        if entry.fs_type != "btrfs" {
            continue;
        }
        if let Some(ident) = entry.subvol_id() {
            info.ids.insert(ident);
            if entry.mount_point == "/"
                && let Some(subvol) = entry.subvol_path()
            {
                info.root_subvol = Some(subvol.trim_start_matches('/').to_string());
            }
        }
    }
    info
}

/// Scan listed subvolumes into the restore view.
///
/// Top-level plain names, dated `=Reverted` markers and snapshots
/// under the `@snapshots` container are collected; a `ToDel` marker
/// that is no longer mounted is deleted on the spot through the
/// executor. `probe` answers whether a relative path contains a
/// captured boot backup directory, so the planner itself stays pure.
pub fn scan_state(
    records: &[SubvolRecord],
    info: &MountedInfo,
    executor: &Executor,
    probe: &dyn Fn(&str) -> bool,
) -> RestoreState {
    let mut subnames = BTreeSet::new();
    let mut snaps_by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut reverts: BTreeMap<String, String> = BTreeMap::new();
    let mut mounted = BTreeSet::new();

    for record in records {
        let path = record.path.as_str();
        if info.ids.contains(&record.id) {
            mounted.insert(path.to_string());
        }
        let (parent, basename) = match path.rsplit_once('/') {
            Some((parent, basename)) => (parent, basename),
            None => ("", path),
        };

        if parent.is_empty() && !basename.ends_with("@snapshot") {
            if basename.contains('.') && basename.ends_with(REVERTED_SUFFIX) {
                if let Some((name, _)) = basename.split_once('.') {
                    reverts.insert(name.to_string(), path.to_string());
                }
            } else if !basename.contains('.') {
                subnames.insert(basename.to_string());
            } else if basename.ends_with(TODEL_SUFFIX) && !mounted.contains(path) {
                if let Err(error) = executor.run(&format!("btrfs sub del \"{path}\"")) {
                    tracing::warn!(%path, %error, "deferred deletion failed");
                }
            }
            continue;
        }

        if parent.ends_with("@snapshots")
            && let Some((name, _)) = basename.split_once('.')
        {
            snaps_by_name
                .entry(name.to_string())
                .or_default()
                .push(path.to_string());
        }
    }

    let mut entries = BTreeMap::new();
    for name in subnames {
        let mut snaps = snaps_by_name.remove(&name).unwrap_or_default();
        snaps.sort();
        let revert = reverts.remove(&name);
        if snaps.is_empty() && revert.is_none() {
            continue;
        }
        entries.insert(
            name,
            RestoreEntry {
                revert: revert.map(|path| SnapSource {
                    has_boot_backup: probe(&path),
                    path,
                }),
                snaps: snaps
                    .into_iter()
                    .map(|path| SnapSource {
                        has_boot_backup: probe(&path),
                        path,
                    })
                    .collect(),
            },
        );
    }

    RestoreState {
        entries,
        mounted,
        root_subvol: info.root_subvol.clone(),
    }
}
