// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Install (or, with a zero cap, remove) the periodic snapshot job
/// under `<base>/cron.<period>/`. Returns the written path and script
/// text for confirmation output.
pub fn install_cron_job(
    base: &Path,
    period: &str,
    cap: u8,
    label: &str,
) -> io::Result<Option<(PathBuf, String)>> {
    let dir = base.join(format!("cron.{period}"));
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", dir.display()),
        ));
    }

    let file = dir.join(format!("{period}-snaps"));
    if cap == 0 {
        if file.is_file() {
            fs::remove_file(&file)?;
        }
        return Ok(None);
    }

    let exe = std::env::current_exe()?;
    let text = format!(
        "#!/bin/sh\n{} -p -s{cap} -L{label} >/tmp/.btrfs-snaps-{period}.txt 2>&1\n",
        exe.display()
    );
    fs::write(&file, &text)?;
    fs::set_permissions(&file, fs::Permissions::from_mode(0o755))?;
    Ok(Some((file, text)))
}
