// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::units::human;

/// A BTRFS-formatted block device holding a forest of subvolumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device basename, e.g. `nvme0n1p2`.
    pub name: String,

    /// Scratch mount of the filesystem root, e.g. `/tmp/.btrfs/nvme0n1p2`.
    pub scratch: PathBuf,

    /// Free-space summary, populated once the scratch mount is up.
    pub space: Option<SpaceSummary>,
}

/// Free-space summary of one filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl SpaceSummary {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

impl std::fmt::Display for SpaceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} used / {} total ({} free)",
            human(self.used_bytes()),
            human(self.total_bytes),
            human(self.free_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_summary_reports_usage() {
        let space = SpaceSummary {
            total_bytes: 4 << 30,
            free_bytes: 1 << 30,
        };
        assert_eq!(space.used_bytes(), 3 << 30);
        assert_eq!(space.to_string(), "3.0G used / 4.0G total (1.0G free)");
    }
}
