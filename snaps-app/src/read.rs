// SPDX-License-Identifier: GPL-3.0-only

use std::io::{self, BufRead};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use crate::signal;

/// Wait interval between interrupt-flag checks while blocked on input.
const TICK: Duration = Duration::from_millis(500);

/// Read one line from stdin, waiting at most `timeout`.
///
/// The wait is a poll loop so an operator interrupt is noticed within
/// one tick. A timeout (or EOF) yields `Ok(None)` — running out of
/// input to wait for is not an error; only an interrupt is.
pub fn read_line_timeout(timeout: Duration) -> io::Result<Option<String>> {
    let stdin = io::stdin();
    let deadline = Instant::now() + timeout;

    loop {
        if signal::interrupted() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        let wait = remaining.min(TICK);

        let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(wait.as_millis() as u16)) {
            Ok(0) => continue,
            Ok(_) => {
                let mut line = String::new();
                let read = stdin.lock().read_line(&mut line)?;
                if read == 0 {
                    return Ok(None);
                }
                return Ok(Some(line.trim_end_matches('\n').to_string()));
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno.into()),
        }
    }
}
