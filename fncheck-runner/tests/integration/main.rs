// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the runner.
//!
//! These run real worker processes: the `fixture-targets` binary built alongside this crate
//! serves worker requests for the targets in `test-helpers/fixture_registry.rs`. The same file is
//! included here so the runner validates targets against the same registry.

#[path = "../../test-helpers/fixture_registry.rs"]
mod fixture_registry;

mod faults;
mod load;
#[cfg(unix)]
mod processes;

use fixture_registry::fixture_registry;
use fncheck_runner::{
    errors::LoadError,
    outcome::{RunResult, TimeoutLimit},
    reporter::Report,
    runner::TestRunnerBuilder,
    target::TargetSpec,
    test_table::{TestCase, TestTable},
    worker::WorkerCommand,
};
use std::time::Duration;

fn worker_command() -> WorkerCommand {
    WorkerCommand::new(env!("CARGO_BIN_EXE_fixture-targets"))
}

/// Options for a single run against the fixture targets.
struct FixtureRun {
    timeout: Duration,
    suppress_target_output: bool,
}

impl Default for FixtureRun {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            suppress_target_output: true,
        }
    }
}

impl FixtureRun {
    fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    fn run(&self, spec: &TargetSpec, cases: Vec<TestCase>) -> Result<RunResult, LoadError> {
        let table = TestTable::from_cases(cases).expect("fixture cases are unique");
        self.run_table(spec, &table)
    }

    fn run_table(&self, spec: &TargetSpec, table: &TestTable) -> Result<RunResult, LoadError> {
        let mut builder = TestRunnerBuilder::default();
        builder
            .set_timeout(TimeoutLimit::new(self.timeout).expect("timeout is positive"))
            .set_suppress_target_output(self.suppress_target_output)
            .set_worker_command(worker_command());
        let runner = builder.build().expect("runner builds");
        runner.run(&fixture_registry(), spec, table)
    }

    fn render(&self, spec: &TargetSpec, cases: Vec<TestCase>) -> String {
        let table = TestTable::from_cases(cases).expect("fixture cases are unique");
        match self.run_table(spec, &table) {
            Ok(result) => Report::new(spec, &table, &result).render(),
            Err(error) => fncheck_runner::reporter::render_load_error(&error),
        }
    }
}
