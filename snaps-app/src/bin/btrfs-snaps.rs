// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot rotation tool: keep a bounded, labeled set of snapshots
//! per mounted top-level subvolume.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, ValueEnum};
use snaps_app::picker::LinePicker;
use snaps_app::{cron, init_tracing, signal, table};
use snaps_model::{Confirmed, ModelError, RotationMode, Session, mutate, rotate, validate_suffix};
use snaps_sys::Executor;
use snaps_types::{Picker, Prompt, SubvolId, timestamp_str};

#[derive(Parser)]
#[command(name = "btrfs-snaps")]
#[command(about = "Rotate labeled BTRFS snapshots per subvolume", long_about = None)]
struct Cli {
    /// Rotate non-interactively, keeping at most this many snapshots
    /// per subvolume (1..=8)
    #[arg(short = 's', long = "cap")]
    cap: Option<u8>,

    /// Label for --cap snapshots, stored as `=<LABEL>`
    #[arg(short = 'L', long)]
    label: Option<String>,

    /// Print the subvolume table and exit
    #[arg(short, long)]
    print: bool,

    /// Install a periodic snapshot anacron job and exit
    #[arg(long, value_enum)]
    cron: Option<Period>,

    /// Dump the discovered model as JSON and exit
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Period {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    fn name(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    fn default_label(self) -> &'static str {
        match self {
            Self::Hourly => "Hourly",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }

    fn default_cap(self) -> u8 {
        match self {
            Self::Monthly => 1,
            _ => 2,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    signal::install_handlers().context("installing signal handlers")?;
    let cli = Cli::parse();

    if let Some(period) = cli.cron {
        return install_cron(&cli, period);
    }

    let mut session = Session::new(Executor::default());
    session.refresh_if_dirty()?;

    if cli.debug {
        session.refresh_usage()?;
        println!("{}", serde_json::to_string_pretty(session.model()?)?);
        return Ok(());
    }

    if let Some(cap) = cli.cap {
        let cap = usize::from(cap.clamp(1, 8));
        let suffix = current_suffix(cli.label.as_deref());
        let executor = session.executor();
        let ok = rotate(
            session.model_mut()?,
            &executor,
            &suffix,
            RotationMode::Replace,
            Some(cap),
        )?;
        println!("{} cap={cap}", if ok { "OK" } else { "FAIL" });
        if ok && cli.print {
            table::print_model(session.model()?, false, false);
        }
        if !ok {
            bail!("rotation failed for at least one subvolume");
        }
        return Ok(());
    }

    if cli.print {
        table::print_model(session.model()?, false, false);
        return Ok(());
    }

    interactive(&mut session)
}

/// Suffix for snapshots taken right now: `.<timestamp>[=<Label>]`.
fn current_suffix(label: Option<&str>) -> String {
    let mut suffix = format!(".{}", timestamp_str(Local::now()));
    if let Some(label) = label {
        suffix.push('=');
        suffix.push_str(&label.replace('=', ""));
    }
    suffix
}

fn install_cron(cli: &Cli, period: Period) -> Result<()> {
    // an explicit zero cap removes the job instead
    let cap = cli.cap.map_or_else(|| period.default_cap(), |cap| cap.min(8));
    let label = cli
        .label
        .clone()
        .unwrap_or_else(|| period.default_label().to_string());
    match cron::install_cron_job(std::path::Path::new("/etc"), period.name(), cap, &label)? {
        Some((file, text)) => println!("OK: to {file:?}, wrote:\n{text}"),
        None => println!("OK: removed job for {}", period.name()),
    }
    Ok(())
}

fn interactive(session: &mut Session) -> Result<()> {
    let mut picker = LinePicker::new();
    let mut show_size = false;

    let menu: BTreeMap<char, Prompt> = BTreeMap::from([
        ('s', Prompt::new("create snapshot for a subvolume")),
        ('d', Prompt::new("delete a subvolume (and its subtree)")),
        ('u', Prompt::new("compute disk usage of all snapshots (slow)")),
        ('r', Prompt::new("replace eldest snapshot of each subvolume")),
        ('a', Prompt::new("add snapshot to each subvolume with snapshots")),
        ('x', Prompt::new("exit")),
    ]);

    loop {
        if signal::interrupted() {
            return Ok(());
        }
        session.refresh_if_dirty()?;
        let rows = table::print_model(session.model()?, show_size, true);

        let choice = picker.pick("btrfs-snaps", &menu, None)?;
        let outcome = match choice.key {
            's' => snapshot_row(session, &mut picker, &rows),
            'd' => delete_row(session, &mut picker, &rows),
            'u' => {
                println!(" ... be patient, traversing all snapshots ...");
                show_size = true;
                session.refresh_usage().map_err(Into::into)
            }
            'r' => rotate_with_prompt(session, &mut picker, RotationMode::Replace),
            'a' => rotate_with_prompt(session, &mut picker, RotationMode::Add),
            'x' => return Ok(()),
            _ => Ok(()),
        };
        if let Err(error) = outcome {
            picker.alert("failed", &format!("{error:#}"));
        }
    }
}

fn pick_row(
    picker: &mut LinePicker,
    rows: &[(String, SubvolId)],
    question: &str,
) -> Result<Option<(String, SubvolId)>> {
    let Some(answer) = picker.answer(question, "")? else {
        return Ok(None);
    };
    let Ok(index) = answer.trim().parse::<usize>() else {
        return Ok(None);
    };
    Ok(rows.get(index).cloned())
}

fn snapshot_row(
    session: &mut Session,
    picker: &mut LinePicker,
    rows: &[(String, SubvolId)],
) -> Result<()> {
    let Some((device, id)) = pick_row(picker, rows, "snapshot which row number?")? else {
        return Ok(());
    };
    let path = session.model()?.subvol(&device, id).path.clone();
    let Some(suffix) = picker.answer(
        &format!("Set suffix for snap {path:?} OR clear"),
        &current_suffix(None),
    )?
    else {
        return Ok(());
    };
    let executor = session.executor();
    mutate::create_snapshot(session.model_mut()?, &executor, &device, id, &suffix)?;
    Ok(())
}

fn delete_row(
    session: &mut Session,
    picker: &mut LinePicker,
    rows: &[(String, SubvolId)],
) -> Result<()> {
    let Some((device, id)) = pick_row(picker, rows, "delete which row number?")? else {
        return Ok(());
    };
    let path = session.model()?.subvol(&device, id).path.clone();
    if !picker.confirm(&format!("Delete {path:?}"))? {
        return Ok(());
    }
    let executor = session.executor();
    mutate::delete_subvolume(session.model_mut()?, &executor, &device, id, Confirmed)?;
    Ok(())
}

fn rotate_with_prompt(
    session: &mut Session,
    picker: &mut LinePicker,
    mode: RotationMode,
) -> Result<()> {
    let mut seed = current_suffix(None);
    loop {
        let labels = {
            let model = session.model()?;
            model.labels.iter().cloned().collect::<Vec<_>>().join(",")
        };
        let Some(suffix) = picker.answer(
            &format!("Set snap suffix OR clear; labels: {labels}"),
            &seed,
        )?
        else {
            return Ok(());
        };
        if let Err(error @ ModelError::Validation(_)) = validate_suffix(&suffix) {
            picker.alert("invalid suffix", &error.to_string());
            seed = suffix;
            continue;
        }
        let executor = session.executor();
        let ok = rotate(session.model_mut()?, &executor, &suffix, mode, None)?;
        if !ok {
            picker.alert("rotation", "at least one subvolume failed; see log output");
        }
        return Ok(());
    }
}
