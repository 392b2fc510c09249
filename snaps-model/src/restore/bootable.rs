// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{ModelError, Result};

/// The three name sets that must agree before a reboot is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootInventory {
    /// Kernel-module version directories under the restored root.
    pub modules: Vec<String>,
    /// Versions registered under the boot-loader's machine-id entries.
    pub entries: Vec<String>,
    /// Versions captured in the backup boot directory.
    pub backups: Vec<String>,
}

/// A reboot is allowed only when at least one version appears in all
/// three sets; otherwise all three are reported for diagnosis.
pub fn verify_bootable(inventory: &BootInventory) -> Result<()> {
    let modules: BTreeSet<&String> = inventory.modules.iter().collect();
    let entries: BTreeSet<&String> = inventory.entries.iter().collect();
    let backups: BTreeSet<&String> = inventory.backups.iter().collect();

    let overlap = modules
        .iter()
        .any(|version| entries.contains(*version) && backups.contains(*version));
    if overlap {
        return Ok(());
    }
    Err(ModelError::Bootability {
        modules: inventory.modules.clone(),
        entries: inventory.entries.clone(),
        backups: inventory.backups.clone(),
    })
}

/// Gate a reboot on module/boot-entry/backup agreement.
///
/// `root_subvol` is the relative path of the subvolume mounted at `/`;
/// the restored copy is inspected under `/mnt`. With no boot-loader
/// entries or no known root subvolume there is nothing to cross-check
/// and the reboot is allowed.
pub fn check_bootable(root_subvol: Option<&str>) -> Result<()> {
    let entries = versions_under_machine_ids(Path::new("/efi"));
    let Some(root_subvol) = root_subvol else {
        return Ok(());
    };
    if entries.is_empty() {
        return Ok(());
    }

    let root = Path::new("/mnt").join(root_subvol);
    let inventory = BootInventory {
        modules: dir_names(&root.join("usr/lib/modules")),
        entries,
        backups: versions_under_machine_ids(&root.join(".efi-back")),
    };
    verify_bootable(&inventory)
}

/// Basenames of a directory's entries, sorted; empty when unreadable.
fn dir_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Boot-loader layouts keep one 32-character machine-id directory per
/// installation; the version names live one level below.
fn versions_under_machine_ids(base: &Path) -> Vec<String> {
    let mut versions = Vec::new();
    for machine_id in dir_names(base) {
        if machine_id.chars().count() != 32 {
            continue;
        }
        versions.extend(dir_names(&base.join(machine_id)));
    }
    versions.sort();
    versions
}
