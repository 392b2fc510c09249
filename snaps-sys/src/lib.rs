// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system boundary for the btrfs-snaps tools
//!
//! Everything here either runs an external command and parses its
//! textual output, or touches the filesystem directly:
//! - `blkid`, `btrfs subvolume list`, `btrfs filesystem show`,
//!   `btrfs filesystem du` invocation and parsing
//! - `/proc/mounts` parsing
//! - scratch mounts under `/tmp/.btrfs` with guaranteed release
//! - free-space summaries via statvfs
//!
//! The parsers are pure functions over captured output so they can be
//! exercised against recorded samples.

pub mod blkid;
pub mod command;
pub mod du;
pub mod error;
pub mod fi_show;
pub mod mounts;
pub mod scratch;
pub mod space;
pub mod subvol_list;

pub use blkid::{list_btrfs_devices, parse_blkid};
pub use command::{CommandOutput, Executor, run_capture, run_checked};
pub use du::{DuEntry, parse_filesystem_du, snapshot_usage};
pub use error::{Result, SysError};
pub use fi_show::{FilesystemRecord, parse_filesystem_show, show_filesystems};
pub use mounts::{MountEntry, parse_mounts, read_proc_mounts};
pub use scratch::ScratchMounts;
pub use space::space_summary;
pub use subvol_list::{SubvolRecord, list_subvolumes, parse_subvolume_list};
