// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::os;
use crate::{
    errors::DisplayErrorChain,
    outcome::{ExecuteStatus, TimeoutLimit},
    target::TargetSpec,
    value::CaseInput,
    worker::{WorkerCommand, WorkerFiles, WorkerReport, WorkerRequest},
};
use std::{process::Stdio, time::Duration};
use tokio::{io::AsyncReadExt, process::ChildStderr};
use tracing::debug;

/// Runs cases in worker processes, each bounded by a deadline.
///
/// A worker that panics, aborts, overflows its stack or is killed by a signal only ever affects
/// its own process: the executor turns all of these into [`ExecuteStatus::Failed`]. A worker that
/// runs past the deadline is killed and reaped before [`execute`](Self::execute) returns.
#[derive(Clone, Debug)]
pub struct IsolatedExecutor {
    worker: WorkerCommand,
    limit: TimeoutLimit,
    suppress_target_output: bool,
}

impl IsolatedExecutor {
    /// Creates a new executor.
    pub fn new(worker: WorkerCommand, limit: TimeoutLimit, suppress_target_output: bool) -> Self {
        Self {
            worker,
            limit,
            suppress_target_output,
        }
    }

    /// Returns the deadline applied to each case.
    pub fn limit(&self) -> TimeoutLimit {
        self.limit
    }

    /// Runs a single case.
    ///
    /// `files` must be in a directory the worker can write to, and must not be reused across
    /// cases.
    pub async fn execute(
        &self,
        spec: &TargetSpec,
        input: &CaseInput,
        files: WorkerFiles,
    ) -> ExecuteStatus {
        if let Err(error) = std::fs::write(files.input_path(), input.as_json()) {
            return ExecuteStatus::Failed {
                trace: format!(
                    "failed to write worker input to `{}`: {}",
                    files.input_path(),
                    DisplayErrorChain(error)
                ),
            };
        }
        let request = WorkerRequest::new(spec.clone(), files);

        let mut cmd = self.worker.to_command(&request);
        cmd.stdin(Stdio::null())
            .stdout(if self.suppress_target_output {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .stderr(Stdio::piped());
        os::set_process_group(&mut cmd);

        let mut cmd = tokio::process::Command::from(cmd);
        // Makes sure the worker doesn't outlive the runner if the future is dropped.
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(error) => {
                debug!(
                    program = %self.worker.program().display(),
                    "error spawning worker: {error}"
                );
                return ExecuteStatus::Failed {
                    trace: format!(
                        "failed to start worker `{}`: {}",
                        self.worker.program().display(),
                        DisplayErrorChain(error)
                    ),
                };
            }
        };
        // The child hasn't been reaped yet, so it has an ID.
        let pid = child.id().unwrap_or_default();
        debug!(pid, %spec, %input, "spawned worker");

        let mut stderr = StderrAccumulator::new(child.stderr.take());

        let sleep = tokio::time::sleep(self.limit.as_duration());
        tokio::pin!(sleep);

        let wait_result = loop {
            tokio::select! {
                () = stderr.fill_buf(), if !stderr.is_done() => {}
                res = child.wait() => break Some(res),
                () = &mut sleep => break None,
            }
        };

        let Some(wait_result) = wait_result else {
            debug!(pid, limit = %self.limit, "deadline elapsed, killing worker");
            os::kill_child(&mut child, pid);
            match child.wait().await {
                Ok(status) => debug!(%status, "reaped worker after timeout"),
                Err(error) => debug!("error reaping worker after timeout: {error}"),
            }
            os::kill_process_group(pid);
            return ExecuteStatus::TimedOut { limit: self.limit };
        };

        // Nothing the target started may outlive its case.
        os::kill_process_group(pid);

        let exit_status = match wait_result {
            Ok(exit_status) => exit_status,
            Err(error) => {
                return ExecuteStatus::Failed {
                    trace: format!("error waiting for worker: {}", DisplayErrorChain(error)),
                };
            }
        };
        debug!(%exit_status, "worker exited");

        match WorkerReport::read_from(request.files().report_path()) {
            Ok(Some(WorkerReport::Ok { output, duration })) => {
                ExecuteStatus::Completed { output, duration }
            }
            Ok(Some(WorkerReport::Failed { trace })) => ExecuteStatus::Failed { trace },
            Ok(None) => {
                let stderr = stderr.drain(STDERR_GRACE_PERIOD).await;
                ExecuteStatus::Failed {
                    trace: abnormal_exit_trace(os::display_exit_status(exit_status), &stderr),
                }
            }
            Err(error) => {
                let stderr = stderr.drain(STDERR_GRACE_PERIOD).await;
                let summary = format!(
                    "{} and left an unreadable report: {}",
                    os::display_exit_status(exit_status),
                    DisplayErrorChain(error)
                );
                ExecuteStatus::Failed {
                    trace: abnormal_exit_trace(summary, &stderr),
                }
            }
        }
    }
}

/// How long to keep reading the worker's standard error after it exits.
///
/// The pipe stays open if a process outside the worker's process group inherited it.
const STDERR_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Collects the worker's standard error while it runs.
#[derive(Debug)]
struct StderrAccumulator {
    stderr: Option<ChildStderr>,
    buf: Vec<u8>,
}

impl StderrAccumulator {
    fn new(stderr: Option<ChildStderr>) -> Self {
        Self {
            stderr,
            buf: Vec::new(),
        }
    }

    fn is_done(&self) -> bool {
        self.stderr.is_none()
    }

    /// Reads the next chunk. Cancel safe.
    async fn fill_buf(&mut self) {
        let Some(stderr) = &mut self.stderr else {
            return;
        };
        match stderr.read_buf(&mut self.buf).await {
            Ok(0) => self.stderr = None,
            Ok(_) => {}
            Err(error) => {
                debug!("error reading worker stderr: {error}");
                self.stderr = None;
            }
        }
    }

    /// Reads until the pipe is closed or the grace period elapses, and returns what was read.
    async fn drain(mut self, grace_period: Duration) -> String {
        let sleep = tokio::time::sleep(grace_period);
        tokio::pin!(sleep);

        while !self.is_done() {
            tokio::select! {
                () = self.fill_buf() => {}
                () = &mut sleep => {
                    debug!(?grace_period, "worker stderr still open after exit, giving up on it");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

fn abnormal_exit_trace(summary: String, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        format!("worker {summary} without reporting a result")
    } else {
        format!("worker {summary} without reporting a result\n{stderr}")
    }
}
