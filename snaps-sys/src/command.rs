// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

use crate::error::{Result, SysError};

/// Captured output of one external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stdout and stderr joined for diagnostics.
    pub fn combined(&self) -> String {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run `command` through the shell, capturing output and exit status.
/// A non-zero exit is reported in the output, not as an error.
pub fn run_capture(command: &str) -> Result<CommandOutput> {
    tracing::debug!(%command, "running");
    let output = Command::new("sh").arg("-c").arg(command).output()?;
    Ok(CommandOutput {
        stdout: split_lines(&output.stdout),
        stderr: split_lines(&output.stderr),
        status: output.status.code().unwrap_or(-1),
    })
}

/// Run `command` through the shell, failing on a non-zero exit with the
/// literal command and captured stderr.
pub fn run_checked(command: &str) -> Result<CommandOutput> {
    let output = run_capture(command)?;
    if !output.success() {
        return Err(SysError::CommandFailed {
            command: command.to_string(),
            status: output.status,
            stderr: output.combined(),
        });
    }
    Ok(output)
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(ToString::to_string)
        .collect()
}

/// Executes mutating commands, or substitutes an echo of the exact
/// command string when dry-run is on. Planning and validation upstream
/// are identical either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    pub dry_run: bool,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run(&self, command: &str) -> Result<CommandOutput> {
        if self.dry_run {
            return run_checked(&format!("echo WOULD + {command:?}"));
        }
        tracing::info!("+ {command}");
        run_checked(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_status() {
        let output = run_capture("echo one; echo two >&2; exit 3").unwrap();
        assert_eq!(output.stdout, vec!["one"]);
        assert_eq!(output.stderr, vec!["two"]);
        assert_eq!(output.status, 3);
        assert!(!output.success());
    }

    #[test]
    fn checked_run_reports_command_and_stderr() {
        let err = run_checked("echo broken >&2; exit 1").unwrap_err();
        match err {
            SysError::CommandFailed {
                command,
                status,
                stderr,
            } => {
                assert!(command.contains("exit 1"));
                assert_eq!(status, 1);
                assert!(stderr.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dry_run_substitutes_echo() {
        let executor = Executor::new(true);
        let output = executor.run("btrfs sub del /tmp/.btrfs/x").unwrap();
        assert_eq!(output.stdout, vec!["WOULD + btrfs sub del /tmp/.btrfs/x"]);
    }
}
