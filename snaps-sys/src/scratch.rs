// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::command::run_checked;
use crate::error::{Result, SysError};

const DEFAULT_BASE: &str = "/tmp/.btrfs";

/// Scratch mounts of whole BTRFS filesystems, one per device, under a
/// common base directory. Mounted on first use and released when the
/// set is dropped, whichever way the process leaves.
#[derive(Debug)]
pub struct ScratchMounts {
    base: PathBuf,
    mounted: Vec<PathBuf>,
}

impl ScratchMounts {
    pub fn new() -> Self {
        Self::with_base(PathBuf::from(DEFAULT_BASE))
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self {
            base,
            mounted: Vec::new(),
        }
    }

    /// Mount point for `device`, mounting it if necessary.
    pub fn ensure(&mut self, device: &str) -> Result<PathBuf> {
        let target = self.base.join(device);
        if is_mount_point(&target)? {
            return Ok(target);
        }

        fs::create_dir_all(&target)?;
        let device_path = format!("/dev/{device}");
        run_checked(&format!("mount {} {}", device_path, target.display())).map_err(
            |error| SysError::MountFailed {
                device: device_path.clone(),
                target: target.display().to_string(),
                detail: error.to_string(),
            },
        )?;
        self.mounted.push(target.clone());
        Ok(target)
    }

    /// Unmount everything this set mounted. Failures are logged and do
    /// not stop the remaining unmounts.
    pub fn release_all(&mut self) {
        for target in self.mounted.drain(..) {
            match run_checked(&format!("umount {}", target.display())) {
                Ok(_) => tracing::debug!(target = %target.display(), "released scratch mount"),
                Err(error) => {
                    tracing::warn!(target = %target.display(), %error, "umount failed");
                }
            }
        }
    }
}

impl Default for ScratchMounts {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchMounts {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// A directory is a mount point when it sits on a different device
/// than its parent.
fn is_mount_point(path: &Path) -> Result<bool> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error.into()),
    };
    let Some(parent) = path.parent() else {
        return Ok(true);
    };
    let parent_metadata = fs::metadata(parent)?;
    Ok(metadata.dev() != parent_metadata.dev())
}
