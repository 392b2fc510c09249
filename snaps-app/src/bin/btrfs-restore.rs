// SPDX-License-Identifier: GPL-3.0-only

//! Disaster-recovery tool: mount a BTRFS filesystem at /mnt, plan a
//! restore sequence from its snapshots and revert markers, and walk
//! the operator through it with a bootability gate before reboot.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use snaps_app::picker::LinePicker;
use snaps_app::{init_tracing, signal};
use snaps_model::restore::{MountedInfo, check_bootable, mounted_info, plan_restores, scan_state};
use snaps_sys::{Executor, parse_subvolume_list, read_proc_mounts, run_checked, show_filesystems};
use snaps_types::{Picker, Prompt};

#[derive(Parser)]
#[command(name = "btrfs-restore")]
#[command(about = "Revert BTRFS subvolumes to earlier snapshots", long_about = None)]
struct Cli {
    /// Plan and echo commands without executing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    init_tracing();
    signal::install_handlers().context("installing signal handlers")?;
    let cli = Cli::parse();
    let mut dry_run = cli.dry_run;
    let mut picker = LinePicker::new();

    let mounts = read_proc_mounts()?;
    let info = mounted_info(&mounts);

    select_mount(&mut picker, &info)?;
    std::env::set_current_dir("/mnt").context("entering /mnt")?;

    let mut todo = 'a';
    loop {
        if signal::interrupted() {
            return Ok(());
        }

        let listing = run_checked("btrfs sub list .")?;
        let records = parse_subvolume_list(&listing.stdout);
        let executor = Executor::new(dry_run);
        let state = scan_state(&records, &info, &executor, &|path| {
            Path::new(path).join(".efi-back").is_dir()
        });
        let actions = plan_restores(&state, Local::now());

        let mut prompts: BTreeMap<char, Prompt> = actions
            .iter()
            .map(|action| {
                (
                    action.key,
                    Prompt::new(action.description.as_str())
                        .with_payload(action.command.as_str()),
                )
            })
            .collect();
        prompts.insert('x', Prompt::new("EXIT"));
        prompts.insert(
            'y',
            Prompt::new(format!(
                "toggle dry-run={}",
                if dry_run { "ON" } else { "OFF" }
            )),
        );

        let title = format!(
            "btrfs-restore menu{}",
            if dry_run { " DRY-RUN" } else { "" }
        );
        let choice = picker.pick(&title, &prompts, Some(todo))?;

        match choice.key {
            'x' => {
                if let Err(error) = check_bootable(state.root_subvol.as_deref()) {
                    eprintln!("{error}");
                }
                return Ok(());
            }
            'y' => {
                dry_run = !dry_run;
            }
            key => {
                let Some(action) = actions.iter().find(|action| action.key == key) else {
                    continue;
                };
                if action.command.contains("reboot")
                    && !dry_run
                    && let Err(error) = check_bootable(state.root_subvol.as_deref())
                {
                    // reboot refused; other actions remain available
                    eprintln!("{error}");
                    todo = choice.next;
                    continue;
                }
                match executor.run(&action.command) {
                    Ok(output) => {
                        for line in output.stdout.iter().chain(output.stderr.iter()) {
                            println!("{line}");
                        }
                    }
                    Err(error) => tracing::error!(%error, "action failed"),
                }
                todo = choice.next;
            }
        }
    }
}

/// Offer every known BTRFS filesystem for `/mnt`; keeping the current
/// occupant is the no-op default. Mount switching runs for real even
/// in dry-run, or there would be nothing to plan against.
fn select_mount(picker: &mut LinePicker, info: &MountedInfo) -> Result<()> {
    let filesystems = show_filesystems()?;
    let mut prompts: BTreeMap<char, Prompt> = BTreeMap::new();

    for (index, filesystem) in filesystems.iter().take(10).enumerate() {
        let Some(key) = char::from_digit(index as u32, 10) else {
            break;
        };
        let command = if Some(&filesystem.device) == info.mnt_device.as_ref() {
            format!("# KEEP {:?} mounted on /mnt", filesystem.device)
        } else {
            let umount = if info.mnt_device.is_some() {
                "umount /mnt && "
            } else {
                ""
            };
            format!(
                "{umount}mount {} /mnt # {}",
                filesystem.device, filesystem.label
            )
        };
        prompts.insert(key, Prompt::new(command.as_str()).with_payload(command));
    }
    if prompts.is_empty() {
        anyhow::bail!("btrfs filesystem show reported no filesystems");
    }

    let choice = picker.pick("select filesystem for /mnt", &prompts, Some('0'))?;
    if let Some(command) = prompts[&choice.key].payload.as_deref()
        && !command.starts_with('#')
    {
        run_checked(command)?;
    }
    Ok(())
}
