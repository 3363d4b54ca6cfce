// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::process::ExitStatus;
use tokio::process::Child;

pub(super) fn set_process_group(_cmd: &mut std::process::Command) {
    // Windows has no process groups to kill: only the worker itself is terminated on timeout.
}

/// Kills the worker. The caller must reap the child afterwards.
pub(super) fn kill_child(child: &mut Child, _pid: u32) {
    if let Err(error) = child.start_kill() {
        tracing::debug!("error killing worker, it has likely exited already: {error}");
    }
}

pub(super) fn kill_process_group(_pid: u32) {
    // Processes started by the target aren't tracked on Windows.
}

pub(super) fn display_exit_status(exit_status: ExitStatus) -> String {
    match exit_status.code() {
        // Codes with the high bit set are NTSTATUS values such as STATUS_STACK_OVERFLOW.
        Some(code) if code < 0 => format!("aborted with code {:#010x}", code as u32),
        Some(code) => format!("exited with exit code {code}"),
        None => "exited with an unknown error".to_owned(),
    }
}
