// SPDX-License-Identifier: GPL-3.0-only

use crate::command::run_checked;
use crate::error::Result;

/// One filesystem reported by `btrfs filesystem show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemRecord {
    /// Filesystem label; empty when unlabeled (`none`).
    pub label: String,
    /// Device path, e.g. `/dev/mmcblk1p2`. Multi-device filesystems
    /// yield one record per device, all under the same label.
    pub device: String,
}

/// Parse `btrfs filesystem show` output:
/// ```text
/// Label: 'endeavouros'  uuid: 8f60fc2f-872d-4327-aff9-34c4c4cefde7
///         Total devices 1 FS bytes used 21.10GiB
///         devid    1 size 118.24GiB used 24.02GiB path /dev/mmcblk1p2
/// ```
pub fn parse_filesystem_show(lines: &[String]) -> Vec<FilesystemRecord> {
    let mut records = Vec::new();
    let mut label = String::new();

    for line in lines {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Label:") {
            label = rest
                .split("uuid:")
                .next()
                .map(str::trim)
                .map(|value| value.trim_matches('\''))
                .filter(|value| !value.is_empty() && *value != "none")
                .unwrap_or_default()
                .to_string();
            continue;
        }
        if line.starts_with("devid")
            && let Some(device) = line.split(" path ").nth(1)
        {
            let device = device.trim();
            if device.starts_with("/dev/") {
                records.push(FilesystemRecord {
                    label: label.clone(),
                    device: device.to_string(),
                });
            }
        }
    }

    records
}

/// Run `btrfs filesystem show` and collect `(label, device)` records.
pub fn show_filesystems() -> Result<Vec<FilesystemRecord>> {
    let output = run_checked("btrfs filesystem show")?;
    Ok(parse_filesystem_show(&output.stdout))
}
