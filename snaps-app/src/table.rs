// SPDX-License-Identifier: GPL-3.0-only

use snaps_model::Model;
use snaps_types::{SubvolId, human};

/// One printable line: a top-level subvolume or one of its snapshots.
struct Row {
    mount: String,
    size: Option<u64>,
    device: String,
    shown: String,
    subvol: (String, SubvolId),
}

/// Print free-space summaries and the subvolume table; returns the
/// rows in printed order so interactive callers can address them by
/// index.
pub fn print_model(model: &Model, show_size: bool, numbered: bool) -> Vec<(String, SubvolId)> {
    for tree in model.trees.values() {
        match &tree.device.space {
            Some(space) => println!("df: {}: {}", tree.device.name, space),
            None => println!("df: {}: ?", tree.device.name),
        }
    }

    let rows = build_rows(model);
    let mount_width = width(rows.iter().map(|row| row.mount.len()), "Mount");
    let device_width = width(rows.iter().map(|row| row.device.len()), "Device");
    let path_width = width(rows.iter().map(|row| row.shown.len()), "Subvolume");

    let mut header = String::new();
    if numbered {
        header.push_str("  # ");
    }
    header.push_str(&format!("{:>mount_width$}", "Mount"));
    if show_size {
        header.push_str(&format!(" {:>7}", "~Size"));
    }
    header.push_str(&format!(
        " {:>device_width$} {:<path_width$}",
        "Device", "Subvolume"
    ));
    println!("{header}");

    for (index, row) in rows.iter().enumerate() {
        let mut line = String::new();
        if numbered {
            line.push_str(&format!("{index:>3} "));
        }
        line.push_str(&format!("{:>mount_width$}", row.mount));
        if show_size {
            let size = match row.size {
                Some(size) => human(size),
                None => "-".to_string(),
            };
            line.push_str(&format!(" {size:>7}"));
        }
        line.push_str(&format!(
            " {:>device_width$} {:<path_width$}",
            row.device, row.shown
        ));
        println!("{line}");
    }

    rows.into_iter().map(|row| row.subvol).collect()
}

fn build_rows(model: &Model) -> Vec<Row> {
    let needle = format!("{}/", model.snaproot_subvol().basename());
    let (snap_dev, snap_id) = &model.snaproot;

    let mut rows = Vec::new();
    for (device, tree) in &model.trees {
        for &root in &tree.roots {
            rows.push(make_row(model, device, root, &needle));
            for &snap in &tree.get(root).snaps {
                let mut row = make_row(model, device, snap, &needle);
                // orphans of the snapshots root stand out
                if device == snap_dev
                    && tree.get(snap).origin == Some(*snap_id)
                    && row.shown.is_char_boundary(3)
                {
                    row.shown.replace_range(..3, "!!!");
                }
                rows.push(row);
            }
        }
    }
    rows
}

fn make_row(model: &Model, device: &str, id: SubvolId, needle: &str) -> Row {
    let subvol = model.subvol(device, id);
    let shown = match subvol.path.split_once(needle) {
        Some((_, rest)) if !subvol.ago.is_empty() => format!("--> {rest} {}", subvol.ago),
        Some((_, rest)) => format!("--> {rest}"),
        None => subvol.path.clone(),
    };
    let mount = match &subvol.mount {
        Some(mount) => mount.clone(),
        None if subvol.is_snapshot() => String::new(),
        None => "~".to_string(),
    };
    Row {
        mount,
        size: subvol.size,
        device: device.to_string(),
        shown,
        subvol: (device.to_string(), id),
    }
}

fn width(lengths: impl Iterator<Item = usize>, heading: &str) -> usize {
    lengths.max().unwrap_or(0).max(heading.len())
}
