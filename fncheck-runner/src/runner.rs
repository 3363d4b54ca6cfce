// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`].

use crate::{
    errors::{LoadError, RunnerBuildError},
    executor::IsolatedExecutor,
    outcome::{ExecutionOutcome, RunResult, RunStats, TimeoutLimit, classify},
    target::{ResolvedTarget, TargetResolver, TargetSpec},
    test_table::TestTable,
    value::CaseInput,
    worker::{WorkerCommand, WorkerFiles},
};
use camino_tempfile::Utf8TempDir;
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Test runner options.
#[derive(Clone, Debug)]
pub struct TestRunnerBuilder {
    timeout: Option<TimeoutLimit>,
    suppress_target_output: bool,
    worker: Option<WorkerCommand>,
}

impl Default for TestRunnerBuilder {
    fn default() -> Self {
        Self {
            timeout: None,
            suppress_target_output: true,
            worker: None,
        }
    }
}

impl TestRunnerBuilder {
    /// Sets the deadline applied to each case. Defaults to [`TimeoutLimit::DEFAULT`].
    pub fn set_timeout(&mut self, timeout: TimeoutLimit) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets whether output the target writes to standard output is discarded. Defaults to true.
    ///
    /// This applies to the worker processes only: the runner's own standard output is never
    /// redirected.
    pub fn set_suppress_target_output(&mut self, suppress: bool) -> &mut Self {
        self.suppress_target_output = suppress;
        self
    }

    /// Sets the command used to start workers. Defaults to [`WorkerCommand::current_exe`].
    pub fn set_worker_command(&mut self, worker: WorkerCommand) -> &mut Self {
        self.worker = Some(worker);
        self
    }

    /// Creates a new test runner.
    pub fn build(self) -> Result<TestRunner, RunnerBuildError> {
        let worker = match self.worker {
            Some(worker) => worker,
            None => WorkerCommand::current_exe()?,
        };
        let limit = self.timeout.unwrap_or(TimeoutLimit::DEFAULT);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("fncheck-runner-worker")
            .build()
            .map_err(RunnerBuildError::TokioRuntimeCreate)?;

        let report_dir = camino_tempfile::Builder::new()
            .prefix("fncheck-run-")
            .tempdir()
            .map_err(RunnerBuildError::TempDirCreate)?;

        Ok(TestRunner {
            executor: IsolatedExecutor::new(worker, limit, self.suppress_target_output),
            runtime,
            report_dir,
        })
    }
}

/// Context for running the cases of a test table.
///
/// Created using [`TestRunnerBuilder::build`]. Each runner performs a single run.
#[derive(Debug)]
pub struct TestRunner {
    executor: IsolatedExecutor,
    runtime: Runtime,
    // Worker inputs and reports for this run are written here. Removed when the run ends.
    report_dir: Utf8TempDir,
}

impl TestRunner {
    /// Returns the deadline applied to each case.
    pub fn timeout(&self) -> TimeoutLimit {
        self.executor.limit()
    }

    /// Resolves the target, then runs every case in the table against it.
    ///
    /// If the target fails to resolve, the error is returned and no case runs.
    pub fn run(
        self,
        resolver: &impl TargetResolver,
        spec: &TargetSpec,
        table: &TestTable,
    ) -> Result<RunResult, LoadError> {
        let target = resolver.resolve(spec)?;
        Ok(self.execute(&target, table, |_| {}))
    }

    /// Runs every case in the table against a resolved target, each in its own worker process.
    ///
    /// The callback is called with progress events. Every case produces exactly one outcome: a
    /// crash or a timeout in one case never stops the run.
    pub fn execute<F>(
        self,
        target: &ResolvedTarget,
        table: &TestTable,
        mut callback: F,
    ) -> RunResult
    where
        F: FnMut(TestEvent<'_>),
    {
        let Self {
            executor,
            runtime,
            report_dir,
        } = self;

        let stopwatch = crate::time::stopwatch();
        callback(TestEvent::RunStarted {
            spec: target.spec(),
            case_count: table.len(),
            limit: executor.limit(),
            start_time: stopwatch.snapshot().start_time,
        });

        let mut result = RunResult::new();
        for (index, (input, expected)) in table.iter().enumerate() {
            callback(TestEvent::CaseStarted { index, input });

            let case_stopwatch = crate::time::stopwatch();
            let files = WorkerFiles::for_case(report_dir.path(), index);
            let status = runtime.block_on(executor.execute(target.spec(), input, files));
            let outcome = classify(expected, status);
            let elapsed = case_stopwatch.snapshot().duration;

            debug!(%input, kind = %outcome.kind(), ?elapsed, "case finished");
            callback(TestEvent::CaseFinished {
                index,
                input,
                outcome: &outcome,
                elapsed,
            });
            result.record(input.clone(), outcome);
        }

        let snapshot = stopwatch.snapshot();
        callback(TestEvent::RunFinished {
            stats: result.stats(),
            start_time: snapshot.start_time,
            end_time: snapshot.end_time(),
            elapsed: snapshot.duration,
        });

        // Every worker has been reaped by now, so nothing is left running on the runtime.
        runtime.shutdown_background();
        if let Err(error) = report_dir.close() {
            debug!("error removing worker report directory: {error}");
        }

        result
    }
}

/// A progress event produced by [`TestRunner::execute`].
#[derive(Clone, Debug)]
pub enum TestEvent<'a> {
    /// The run is about to start.
    RunStarted {
        /// The target under test.
        spec: &'a TargetSpec,

        /// The number of cases that will run.
        case_count: usize,

        /// The deadline applied to each case.
        limit: TimeoutLimit,

        /// When the run started.
        start_time: DateTime<Local>,
    },

    /// A case is about to start.
    CaseStarted {
        /// The position of the case in the table.
        index: usize,

        /// The input of the case.
        input: &'a CaseInput,
    },

    /// A case finished.
    CaseFinished {
        /// The position of the case in the table.
        index: usize,

        /// The input of the case.
        input: &'a CaseInput,

        /// The outcome of the case.
        outcome: &'a ExecutionOutcome,

        /// The wall-clock time taken by the case, including starting and stopping the worker.
        elapsed: Duration,
    },

    /// Every case finished.
    RunFinished {
        /// Statistics for the run.
        stats: RunStats,

        /// When the run started.
        start_time: DateTime<Local>,

        /// When the run finished.
        end_time: DateTime<Local>,

        /// The wall-clock time taken by the run.
        elapsed: Duration,
    },
}
