// SPDX-License-Identifier: GPL-3.0-only

//! Shared glue for the btrfs-snaps CLI binaries: a line-oriented
//! picker, the interrupt flag, table rendering and the periodic-job
//! installer.

pub mod cron;
pub mod picker;
pub mod read;
pub mod signal;
pub mod table;

/// Tracing to stderr, `RUST_LOG` filtered, default `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
