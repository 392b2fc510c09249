// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use crate::command::run_checked;
use crate::error::Result;

/// Flat record from `btrfs subvolume list`.
///
/// `path` is kept exactly as printed (relative, no leading slash);
/// consumers decide whether to anchor it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolRecord {
    pub id: u64,
    pub parent_id: u64,
    pub path: String,
}

/// Parse `btrfs subvolume list` lines:
/// `ID 667 gen 216849 top level 5 path eos@my-opt`.
/// Paths may contain spaces; everything after the `path` keyword is
/// taken verbatim. Malformed lines are skipped.
pub fn parse_subvolume_list(lines: &[String]) -> Vec<SubvolRecord> {
    let mut records = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 9 || fields[0] != "ID" {
            continue;
        }
        let Ok(id) = fields[1].parse() else {
            continue;
        };
        let Ok(parent_id) = fields[6].parse() else {
            continue;
        };
        let Some(path_idx) = fields.iter().position(|field| *field == "path") else {
            continue;
        };
        let path = fields[path_idx + 1..].join(" ");
        if path.is_empty() {
            continue;
        }
        records.push(SubvolRecord {
            id,
            parent_id,
            path,
        });
    }
    records
}

/// Run `btrfs subvolume list` against a mounted filesystem root.
pub fn list_subvolumes(mount: &Path) -> Result<Vec<SubvolRecord>> {
    let output = run_checked(&format!("btrfs subvolume list {}", mount.display()))?;
    Ok(parse_subvolume_list(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_id_parent_and_path() {
        let sample = lines(&[
            "ID 667 gen 216849 top level 5 path eos@my-opt",
            "ID 699 gen 217076 top level 5 path eos@snapshots",
            "ID 782 gen 216001 top level 699 path eos@snapshots/eos@root.2024-01-10-174732=Update",
            "garbage",
            "ID x gen 1 top level 5 path broken",
        ]);

        let records = parse_subvolume_list(&sample);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, 667);
        assert_eq!(records[0].parent_id, 5);
        assert_eq!(records[0].path, "eos@my-opt");
        assert_eq!(records[2].parent_id, 699);
        assert_eq!(
            records[2].path,
            "eos@snapshots/eos@root.2024-01-10-174732=Update"
        );
    }

    #[test]
    fn joins_paths_containing_spaces() {
        let sample = lines(&["ID 7 gen 2 top level 5 path eos@my docs"]);
        assert_eq!(parse_subvolume_list(&sample)[0].path, "eos@my docs");
    }
}
