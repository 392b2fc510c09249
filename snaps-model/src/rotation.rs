// SPDX-License-Identifier: GPL-3.0-only

//! Rotation policy engine: discard the eldest snapshots of a label
//! group, then create one replacement, per rotation target.

use snaps_sys::Executor;
use snaps_types::SubvolId;

use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::mutate::{Confirmed, create_snapshot, delete_subvolume};
use crate::snapshots::label_of;

/// Fixed ceiling of add mode: add, never exceed.
pub const ADD_CEILING: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Keep every target's generation count in lockstep: the limit is
    /// an explicit cap, or the largest group seen this run.
    Replace,
    /// Grow each group up to the fixed ceiling.
    Add,
}

/// A snapshot suffix is the separator, at least four further
/// characters, and no nested separator or slash.
pub fn validate_suffix(suffix: &str) -> Result<()> {
    if suffix.len() < 5 || !suffix.starts_with('.') || suffix[1..].contains(['.', '/']) {
        return Err(ModelError::Validation(format!(
            "{suffix:?} must be \".\" plus 4 or more characters without any \".\" or \"/\""
        )));
    }
    Ok(())
}

struct TargetPlan {
    device: String,
    target: SubvolId,
    discard: Vec<SubvolId>,
    has_snaps: bool,
}

/// Rotate every snap target under the label carried by `suffix`.
///
/// Every target is attempted even after a failure; the aggregate
/// result latches to failure on the first failed target and never
/// recovers. Targets without any snapshot are skipped: rotation never
/// starts a new lineage.
pub fn rotate(
    model: &mut Model,
    executor: &Executor,
    suffix: &str,
    mode: RotationMode,
    cap: Option<usize>,
) -> Result<bool> {
    validate_suffix(suffix)?;
    let label = label_of(suffix);

    let counts: Vec<usize> = model
        .snap_targets
        .iter()
        .map(|(device, id)| group_len(model, device, *id, &label))
        .collect();
    let max_count = counts.into_iter().max().unwrap_or(0);

    let plans: Vec<TargetPlan> = model
        .snap_targets
        .iter()
        .map(|(device, id)| {
            let subvol = model.subvol(device, *id);
            let group = subvol.label_groups.get(&label).cloned().unwrap_or_default();
            let limit = match mode {
                RotationMode::Add => ADD_CEILING,
                RotationMode::Replace => cap.unwrap_or(max_count),
            };
            let discard_count = (group.len() + 1).saturating_sub(limit).min(group.len());
            TargetPlan {
                device: device.clone(),
                target: *id,
                discard: group[..discard_count].to_vec(),
                has_snaps: !subvol.snaps.is_empty(),
            }
        })
        .collect();

    let mut success: Option<bool> = None;
    for plan in plans {
        if !plan.has_snaps {
            continue;
        }
        let outcome = rotate_one(model, executor, &plan, suffix);
        let ok = match outcome {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    subvolume = %model.subvol(&plan.device, plan.target).path,
                    %error,
                    "rotation target failed"
                );
                false
            }
        };
        success = Some(match success {
            Some(false) => false,
            _ => ok,
        });
    }
    Ok(success.unwrap_or(true))
}

/// Discards must all succeed before the replacement is attempted.
fn rotate_one(
    model: &mut Model,
    executor: &Executor,
    plan: &TargetPlan,
    suffix: &str,
) -> Result<()> {
    for &snap in &plan.discard {
        delete_subvolume(model, executor, &plan.device, snap, Confirmed)?;
    }
    create_snapshot(model, executor, &plan.device, plan.target, suffix)
}

fn group_len(model: &Model, device: &str, id: SubvolId, label: &str) -> usize {
    model
        .subvol(device, id)
        .label_groups
        .get(label)
        .map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaps_sys::parse_mounts;

    use crate::model::fixtures::{self, device, record};

    fn executor() -> Executor {
        Executor::new(true)
    }

    #[test]
    fn suffix_validation_rejects_malformed_input() {
        assert!(validate_suffix(".2024-01-10-174732=Daily").is_ok());
        assert!(validate_suffix(".abcd").is_ok());
        assert!(validate_suffix("x1234").is_err());
        assert!(validate_suffix(".abc").is_err());
        assert!(validate_suffix(".ab=cd.ef").is_err());
        assert!(validate_suffix(".ab/cd").is_err());
        assert!(validate_suffix("").is_err());
    }

    #[test]
    fn replace_keeps_group_size_with_matching_limit() {
        // eos@root has 3 dailies; cap 3 means one discard, one create.
        let mut model = fixtures::model();
        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Daily",
            RotationMode::Replace,
            Some(3),
        )
        .unwrap();
        assert!(ok);
        assert!(model.dirty);
    }

    #[test]
    fn replace_without_cap_uses_largest_group() {
        // home has 1 daily, root has 3: limit is 3, so home discards
        // nothing and still gets its replacement created.
        let mut model = fixtures::model();
        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Daily",
            RotationMode::Replace,
            None,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn rotation_skips_targets_without_any_snapshot() {
        // A target with no snapshots at all is left alone: rotation
        // never starts a lineage.
        let records = vec![
            record(318, 5, "eos@root"),
            record(699, 5, "eos@snapshots"),
        ];
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();

        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000",
            RotationMode::Replace,
            None,
        )
        .unwrap();
        assert!(ok);
        assert!(!model.dirty);
    }

    #[test]
    fn only_the_eldest_snapshot_is_discarded() {
        // Pin the second-eldest daily by mounting it: if rotation
        // touched anything but the eldest, the mount conflict would
        // fail the run.
        let records = vec![
            record(318, 5, "eos@root"),
            record(699, 5, "eos@snapshots"),
            record(801, 699, "eos@snapshots/eos@root.2024-01-10-174732=Daily"),
            record(802, 699, "eos@snapshots/eos@root.2024-01-11-084102=Daily"),
            record(803, 699, "eos@snapshots/eos@root.2024-01-12-084102=Daily"),
        ];
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n\
             /dev/sda2 /pinned btrfs rw,subvolid=802 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();

        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Daily",
            RotationMode::Replace,
            Some(3),
        )
        .unwrap();
        assert!(ok);

        // pinning the eldest itself blocks the whole target
        let records = vec![
            record(318, 5, "eos@root"),
            record(699, 5, "eos@snapshots"),
            record(801, 699, "eos@snapshots/eos@root.2024-01-10-174732=Daily"),
            record(802, 699, "eos@snapshots/eos@root.2024-01-11-084102=Daily"),
            record(803, 699, "eos@snapshots/eos@root.2024-01-12-084102=Daily"),
        ];
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n\
             /dev/sda2 /pinned btrfs rw,subvolid=801 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();
        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Daily",
            RotationMode::Replace,
            Some(3),
        )
        .unwrap();
        assert!(!ok);
        // the failed discard suppressed the replacement: no command
        // ran at all, so the model never went dirty
        assert!(!model.dirty);
    }

    #[test]
    fn failure_latches_across_later_successes() {
        // Make the first target's discard fail by mounting the
        // snapshot that would be discarded; the second target still
        // rotates, yet the aggregate stays failed.
        let records = vec![
            record(318, 5, "eos@root"),
            record(319, 5, "eos@home"),
            record(699, 5, "eos@snapshots"),
            record(801, 699, "eos@snapshots/eos@root.2024-01-10-174732=Daily"),
            record(804, 699, "eos@snapshots/eos@home.2024-01-12-084102=Daily"),
        ];
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /home btrfs rw,subvolid=319 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n\
             /dev/sda2 /pinned btrfs rw,subvolid=801 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();

        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Daily",
            RotationMode::Replace,
            Some(1),
        )
        .unwrap();
        assert!(!ok);
        // the second target's create still ran and marked the model
        assert!(model.dirty);
    }

    #[test]
    fn add_mode_discards_only_above_ceiling() {
        let mut records = vec![
            record(318, 5, "eos@root"),
            record(699, 5, "eos@snapshots"),
        ];
        for day in 1..=ADD_CEILING as u64 {
            records.push(record(
                800 + day,
                699,
                &format!("eos@snapshots/eos@root.2024-01-{day:02}-000000=Hourly"),
            ));
        }
        let mounts = parse_mounts(
            "/dev/sda2 / btrfs rw,subvolid=318 0 0\n\
             /dev/sda2 /.snapshots btrfs rw,subvolid=699 0 0\n",
        );
        let mut model = crate::Model::build(
            vec![(device("sda2"), records)],
            &mounts,
            fixtures::now(),
        )
        .unwrap();

        let ok = rotate(
            &mut model,
            &executor(),
            ".2024-01-15-120000=Hourly",
            RotationMode::Add,
            None,
        )
        .unwrap();
        assert!(ok);
        assert!(model.dirty);
    }
}
