// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use snaps_types::parse_human;

use crate::command::run_capture;
use crate::error::Result;

/// One row of `btrfs filesystem du -s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuEntry {
    /// Path as printed, relative to the filesystem root.
    pub path: String,
    pub total_bytes: u64,
    pub exclusive_bytes: u64,
}

/// Parse `btrfs filesystem du -s` output. The header row and rows with
/// unparsable size columns are skipped.
///
/// ```text
///      Total   Exclusive  Set shared  Filename
///    3.50GiB     1.00MiB     2.25GiB  eos@snapshots/eos@root.2024-01-10-174732
/// ```
pub fn parse_filesystem_du(lines: &[String]) -> Vec<DuEntry> {
    let mut entries = Vec::new();
    for line in lines.iter().skip(1) {
        let mut fields = line.split_whitespace();
        let (Some(total), Some(exclusive), Some(_shared)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let path = fields.collect::<Vec<_>>().join(" ");
        if path.is_empty() {
            continue;
        }
        let (Some(total_bytes), Some(exclusive_bytes)) =
            (parse_human(total), parse_human(exclusive))
        else {
            tracing::warn!(%line, "unparsable du row");
            continue;
        };
        entries.push(DuEntry {
            path,
            total_bytes,
            exclusive_bytes,
        });
    }
    entries
}

/// Summarize usage of everything under the snapshots root. Slow on
/// large filesystems; callers decide when it is worth running.
pub fn snapshot_usage(scratch: &Path, snaproot_rel: &str) -> Result<Vec<DuEntry>> {
    let command = format!(
        "cd \"{}\" && btrfs filesystem du -s {snaproot_rel}/*",
        scratch.display()
    );
    let output = run_capture(&command)?;
    Ok(parse_filesystem_du(&output.stdout))
}
