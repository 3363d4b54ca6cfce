// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use libc::SIGKILL;
use std::{
    os::unix::process::{CommandExt, ExitStatusExt},
    process::ExitStatus,
};
use tokio::process::Child;
use tracing::debug;

/// Pre-execution configuration on Unix.
///
/// This puts the worker in its own process group, so that anything it spawns is killed along with
/// it.
pub(super) fn set_process_group(cmd: &mut std::process::Command) {
    cmd.process_group(0);
}

/// Kills the worker's process group on timeout. The caller must reap the child afterwards.
pub(super) fn kill_child(_child: &mut Child, pid: u32) {
    kill_process_group(pid);
}

/// Kills whatever is left in the worker's process group.
///
/// This is called after the worker has been reaped, too: processes the target started are still in
/// the group, and a group ID isn't reused while the group has members.
pub(super) fn kill_process_group(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: kill has no memory safety requirements. pid is the ID of a process group created
    // for the worker.
    let ret = unsafe { libc::kill(-pid, SIGKILL) };
    if ret == 0 {
        debug!(pgid = pid, "killed worker process group");
    }
}

pub(super) fn display_exit_status(exit_status: ExitStatus) -> String {
    if let Some(sig) = exit_status.signal() {
        return match signal_str(sig) {
            Some(s) => format!("aborted with signal {sig} (SIG{s})"),
            None => format!("aborted with signal {sig}"),
        };
    }
    match exit_status.code() {
        Some(code) => format!("exited with exit code {code}"),
        None => "exited with an unknown error".to_owned(),
    }
}

fn signal_str(signal: i32) -> Option<&'static str> {
    // These signal numbers are the same on at least Linux, macOS, FreeBSD and illumos.
    match signal {
        1 => Some("HUP"),
        2 => Some("INT"),
        3 => Some("QUIT"),
        4 => Some("ILL"),
        5 => Some("TRAP"),
        6 => Some("ABRT"),
        8 => Some("FPE"),
        9 => Some("KILL"),
        11 => Some("SEGV"),
        13 => Some("PIPE"),
        14 => Some("ALRM"),
        15 => Some("TERM"),
        _ => None,
    }
}
