// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, Local};
use snaps_types::{RestoreAction, ago_whence, next_key, timestamp_str};

use crate::restore::state::{RestoreState, SnapSource};

/// Build the ordered recovery action list from a scanned state.
///
/// Per name: an optional revert of the parked marker (with a deferred
/// deletion when the live copy is mounted), an optional cleanup of the
/// marker, then one restore action per snapshot oldest to newest, and
/// finally a universal reboot. Keys run consecutively from `a`; given
/// the same state the plan is always identical.
pub fn plan_restores(state: &RestoreState, now: DateTime<Local>) -> Vec<RestoreAction> {
    let mut actions = Vec::new();
    let mut key = 'a';

    for (name, entry) in &state.entries {
        let mut lead = name.clone();
        let prep;

        if let Some(revert) = &entry.revert {
            let mut run = sync_prefix(state, name, revert);
            if state.mounted.contains(name) {
                // a mounted live copy cannot be deleted; park it
                run.push_str(&format!("mv \"{name}\" \"{name}.ToDel\" && "));
            } else {
                run.push_str(&format!("btrfs sub del \"{name}\" && "));
            }
            run.push_str(&format!("mv \"{}\" \"{name}\"", revert.path));
            actions.push(RestoreAction::new(
                key,
                format!("{lead}: revert {}", revert.path),
                run,
            ));
            key = next_key(key);
            lead = " ".repeat(lead.len());

            if !state.mounted.contains(&revert.path) {
                actions.push(RestoreAction::new(
                    key,
                    format!("{lead}: del {}", revert.path),
                    format!("btrfs sub del \"{}\"", revert.path),
                ));
                key = next_key(key);
            }
            prep = format!("btrfs sub del \"{name}\" && ");
        } else {
            prep = format!(
                "mv \"{name}\" \"{name}.{}{}\" && ",
                timestamp_str(now),
                super::state::REVERTED_SUFFIX
            );
        }

        for snap in &entry.snaps {
            let base = snap.path.rsplit('/').next().unwrap_or(&snap.path);
            let sync = sync_prefix(state, name, snap);
            actions.push(RestoreAction::new(
                key,
                format!("{lead}: restore {base} {}", ago_whence(base, now)),
                format!("{prep}{sync}btrfs sub snap \"{}\" \"{name}\"", snap.path),
            ));
            key = next_key(key);
            lead = " ".repeat(lead.len());
        }
    }

    actions.push(RestoreAction::new(key, "reboot now", "reboot now"));
    actions
}

/// Mirrored one-way sync of a captured boot backup into the live
/// boot-loader area, prepended only when restoring the boot subvolume.
fn sync_prefix(state: &RestoreState, name: &str, source: &SnapSource) -> String {
    if source.has_boot_backup && state.root_subvol.as_deref() == Some(name) {
        format!("rsync -a -del -H \"{}/.efi-back/\" \"/efi/\" && ", source.path)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::{BTreeMap, BTreeSet};

    use crate::restore::state::RestoreEntry;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn source(path: &str) -> SnapSource {
        SnapSource {
            path: path.to_string(),
            has_boot_backup: false,
        }
    }

    #[test]
    fn two_snapshots_without_marker_yield_three_actions() {
        let state = RestoreState {
            entries: BTreeMap::from([(
                "eos@root".to_string(),
                RestoreEntry {
                    revert: None,
                    snaps: vec![
                        source("eos@snapshots/eos@root.2024-01-10-174732=Update"),
                        source("eos@snapshots/eos@root.2024-01-12-084102=Daily"),
                    ],
                },
            )]),
            mounted: BTreeSet::new(),
            root_subvol: None,
        };

        let actions = plan_restores(&state, now());
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].key, 'a');
        assert_eq!(actions[1].key, 'b');
        assert_eq!(actions[2].key, 'c');
        assert_eq!(actions[0].next, 'b');

        assert!(actions[0].description.contains("restore eos@root.2024-01-10-174732=Update"));
        assert_eq!(
            actions[0].command,
            "mv \"eos@root\" \"eos@root.2024-01-15-120000=Reverted\" && \
             btrfs sub snap \"eos@snapshots/eos@root.2024-01-10-174732=Update\" \"eos@root\""
        );
        assert!(actions[1].description.contains("2024-01-12-084102=Daily"));
        assert_eq!(actions[2].description, "reboot now");
        assert_eq!(actions[2].command, "reboot now");
    }

    #[test]
    fn revert_marker_produces_revert_then_cleanup_then_restores() {
        let state = RestoreState {
            entries: BTreeMap::from([(
                "eos@root".to_string(),
                RestoreEntry {
                    revert: Some(source("eos@root.2024-01-09-000000=Reverted")),
                    snaps: vec![source("eos@snapshots/eos@root.2024-01-10-174732")],
                },
            )]),
            mounted: BTreeSet::from(["eos@root".to_string()]),
            root_subvol: None,
        };

        let actions = plan_restores(&state, now());
        let keys: Vec<char> = actions.iter().map(|action| action.key).collect();
        assert_eq!(keys, ['a', 'b', 'c', 'd']);

        // live copy is mounted: parked for deferred deletion, not deleted
        assert_eq!(
            actions[0].command,
            "mv \"eos@root\" \"eos@root.ToDel\" && \
             mv \"eos@root.2024-01-09-000000=Reverted\" \"eos@root\""
        );
        assert_eq!(
            actions[1].command,
            "btrfs sub del \"eos@root.2024-01-09-000000=Reverted\""
        );
        // with a marker claiming the parked name, restores delete outright
        assert!(actions[2].command.starts_with("btrfs sub del \"eos@root\" && "));
        assert_eq!(actions[3].description, "reboot now");
    }

    #[test]
    fn mounted_marker_skips_the_cleanup_action() {
        let state = RestoreState {
            entries: BTreeMap::from([(
                "eos@root".to_string(),
                RestoreEntry {
                    revert: Some(source("eos@root.2024-01-09-000000=Reverted")),
                    snaps: vec![],
                },
            )]),
            mounted: BTreeSet::from(["eos@root.2024-01-09-000000=Reverted".to_string()]),
            root_subvol: None,
        };

        let actions = plan_restores(&state, now());
        assert_eq!(actions.len(), 2);
        assert!(actions[0].description.contains("revert"));
        assert_eq!(actions[1].description, "reboot now");
        // unmounted live copy is deleted outright in the revert step
        assert!(actions[0].command.starts_with("btrfs sub del \"eos@root\" && "));
    }

    #[test]
    fn boot_subvolume_restores_prepend_the_boot_sync() {
        let state = RestoreState {
            entries: BTreeMap::from([(
                "eos@root".to_string(),
                RestoreEntry {
                    revert: None,
                    snaps: vec![SnapSource {
                        path: "eos@snapshots/eos@root.2024-01-10-174732".to_string(),
                        has_boot_backup: true,
                    }],
                },
            )]),
            mounted: BTreeSet::new(),
            root_subvol: Some("eos@root".to_string()),
        };

        let actions = plan_restores(&state, now());
        assert!(actions[0].command.contains(
            "rsync -a -del -H \"eos@snapshots/eos@root.2024-01-10-174732/.efi-back/\" \"/efi/\" && "
        ));
    }

    #[test]
    fn planning_is_deterministic() {
        let state = RestoreState {
            entries: BTreeMap::from([
                (
                    "eos@home".to_string(),
                    RestoreEntry {
                        revert: None,
                        snaps: vec![source("eos@snapshots/eos@home.2024-01-10-174732")],
                    },
                ),
                (
                    "eos@root".to_string(),
                    RestoreEntry {
                        revert: None,
                        snaps: vec![source("eos@snapshots/eos@root.2024-01-10-174732")],
                    },
                ),
            ]),
            mounted: BTreeSet::new(),
            root_subvol: None,
        };

        let first = plan_restores(&state, now());
        let second = plan_restores(&state, now());
        assert_eq!(first, second);
        // entries are visited in name order
        assert!(first[0].description.starts_with("eos@home"));
        assert!(first[1].description.starts_with("eos@root"));
    }
}
