// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker program for the integration tests. Serves requests for the targets in
//! `fixture_registry.rs`.

mod fixture_registry;

use fncheck_runner::worker::{WorkerCommand, run_worker};
use std::process::ExitCode;

fn main() -> ExitCode {
    if !WorkerCommand::is_worker_invocation(std::env::args_os().skip(1)) {
        eprintln!(
            "fixture-targets only runs as a worker: pass `{}`",
            WorkerCommand::SUBCOMMAND_NAME
        );
        return ExitCode::from(2);
    }

    match run_worker(&fixture_registry::fixture_registry()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
