// SPDX-License-Identifier: GPL-3.0-only

//! Relationship inferencer: classifies subvolumes stored under the
//! snapshots root as snapshots of their origins, purely from naming.

use std::collections::{BTreeMap, BTreeSet};

use snaps_types::SubvolId;

use crate::tree::DeviceTree;

/// Label suffix of a snapshot remainder: everything from the last `=`,
/// empty when there is none.
pub fn label_of(text: &str) -> String {
    match text.rsplit_once('=') {
        Some((_, label)) => format!("={label}"),
        None => String::new(),
    }
}

/// Split `<origin-basename>.<timestamp>[=<label>]`: the cut is the
/// rightmost dot followed by a timestamp character (digit, dash or
/// colon). Returns the origin basename and the remainder after the
/// dot.
fn parse_snapshot_name(rest: &str) -> Option<(&str, &str)> {
    let bytes = rest.as_bytes();
    for dot in (0..bytes.len()).rev() {
        if bytes[dot] == b'.'
            && dot + 1 < bytes.len()
            && matches!(bytes[dot + 1], b'0'..=b'9' | b'-' | b':')
        {
            return Some((&rest[..dot], &rest[dot + 1..]));
        }
    }
    None
}

/// Link every subvolume living under the snapshots root to its origin.
///
/// Origins are looked up by `/<basename>` on the same device, so two
/// subvolumes sharing a basename under different parents resolve to
/// the top-level one; kept as observed behavior. Unparseable names and
/// unresolved origins become orphans of the snapshots root itself:
/// still deletable, never rotated.
///
/// Returns the set of labels seen on resolved snapshots.
pub fn infer_snapshots(
    trees: &mut BTreeMap<String, DeviceTree>,
    snaproot: &(String, SubvolId),
) -> BTreeSet<String> {
    let needle = {
        let tree = &trees[&snaproot.0];
        format!("{}/", tree.get(snaproot.1).basename())
    };

    let mut labels = BTreeSet::new();
    for (device, tree) in trees.iter_mut() {
        for id in tree.ids().collect::<Vec<_>>() {
            let path = tree.get(id).path.clone();
            let Some((_, rest)) = path.split_once(&needle) else {
                continue;
            };

            let origin = parse_snapshot_name(rest).and_then(|(base, remainder)| {
                tree.by_path
                    .get(&format!("/{base}"))
                    .map(|&origin| (origin, label_of(remainder)))
            });

            match origin {
                Some((origin, label)) => {
                    link(tree, origin, id, &label);
                    labels.insert(label);
                }
                None if device == &snaproot.0 => {
                    // Orphan: track under the snapshots root for
                    // deletion, outside any rotation group.
                    link_orphan(tree, snaproot.1, id);
                }
                None => {
                    tracing::warn!(%path, "orphan snapshot outside the snapshots-root device");
                }
            }
        }
    }
    labels
}

fn link(tree: &mut DeviceTree, origin: SubvolId, snap: SubvolId, label: &str) {
    if origin == snap {
        return;
    }
    push_sorted_snap(tree, origin, snap);
    tree.get_mut(snap).origin = Some(origin);
    tree.get_mut(snap).label = label.to_string();

    let mut groups = std::mem::take(&mut tree.get_mut(origin).label_groups);
    let group = groups.entry(label.to_string()).or_default();
    group.push(snap);
    group.sort_by(|a, b| tree.get(*a).path.cmp(&tree.get(*b).path));
    tree.get_mut(origin).label_groups = groups;
}

fn link_orphan(tree: &mut DeviceTree, snaproot: SubvolId, snap: SubvolId) {
    if snaproot == snap {
        return;
    }
    push_sorted_snap(tree, snaproot, snap);
    tree.get_mut(snap).origin = Some(snaproot);
}

fn push_sorted_snap(tree: &mut DeviceTree, owner: SubvolId, snap: SubvolId) {
    let mut snaps = std::mem::take(&mut tree.get_mut(owner).snaps);
    snaps.push(snap);
    snaps.sort_by(|a, b| tree.get(*a).path.cmp(&tree.get(*b).path));
    tree.get_mut(owner).snaps = snaps;
}
