// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use nix::sys::statvfs::statvfs;
use snaps_types::SpaceSummary;

use crate::error::{Result, SysError};

/// Free-space summary of the filesystem holding `path`.
pub fn space_summary(path: &Path) -> Result<SpaceSummary> {
    let stat = statvfs(path).map_err(|errno| SysError::Io(errno.into()))?;
    let fragment = stat.fragment_size() as u64;
    Ok(SpaceSummary {
        total_bytes: stat.blocks() as u64 * fragment,
        free_bytes: stat.blocks_free() as u64 * fragment,
    })
}
