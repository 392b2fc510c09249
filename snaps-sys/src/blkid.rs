// SPDX-License-Identifier: GPL-3.0-only

use crate::command::run_capture;
use crate::error::{Result, SysError};

/// Basenames of the BTRFS-formatted block devices reported by `blkid`.
///
/// A line looks like
/// `/dev/nvme0n1p2: LABEL="btrfs-common" UUID="..." TYPE="btrfs" ...`;
/// only entries with `TYPE="btrfs"` are kept.
pub fn parse_blkid(lines: &[String]) -> Vec<String> {
    let mut devices = Vec::new();
    for line in lines {
        let Some((device, attributes)) = line.split_once(':') else {
            continue;
        };
        if !attributes.contains("TYPE=\"btrfs\"") {
            continue;
        }
        let basename = device.rsplit('/').next().unwrap_or_default();
        if !basename.is_empty() {
            devices.push(basename.to_string());
        }
    }
    devices
}

/// Run `blkid` and return the BTRFS device basenames.
pub fn list_btrfs_devices() -> Result<Vec<String>> {
    which::which("blkid").map_err(|_| SysError::ToolMissing("blkid".to_string()))?;
    let output = run_capture("blkid")?;
    Ok(parse_blkid(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn keeps_only_btrfs_devices() {
        let sample = lines(&[
            "/dev/nvme0n1p2: LABEL=\"btrfs-common\" UUID=\"8f60fc2f\" TYPE=\"btrfs\" PARTUUID=\"02b5122d\"",
            "/dev/nvme0n1p1: UUID=\"1D7A-1E2F\" TYPE=\"vfat\" PARTUUID=\"9e1a\"",
            "/dev/mmcblk1p2: UUID=\"aa\" TYPE=\"btrfs\"",
            "not a blkid line",
        ]);

        assert_eq!(parse_blkid(&sample), vec!["nvme0n1p2", "mmcblk1p2"]);
    }
}
