// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processes started by a target, and what happens to them once its case is over.

use crate::FixtureRun;
use camino::Utf8PathBuf;
use camino_tempfile::{Utf8TempDir, tempdir};
use fncheck_runner::{
    outcome::{ExecutionOutcome, OutcomeKind, TimeoutLimit},
    target::TargetSpec,
    test_table::TestCase,
    value::CaseInput,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

struct SpawnChild {
    _dir: Utf8TempDir,
    pid_file: Utf8PathBuf,
    input: Value,
}

impl SpawnChild {
    fn new(then: &str) -> Self {
        let dir = tempdir().unwrap();
        let pid_file = dir.path().join("child.pid");
        let input = json!([pid_file.as_str(), then]);
        Self {
            _dir: dir,
            pid_file,
            input,
        }
    }

    fn spec() -> TargetSpec {
        TargetSpec::new("processes", "spawn_child")
    }

    fn case(&self, expected: Value) -> TestCase {
        TestCase::new(self.input.clone(), expected)
    }

    fn child_pid(&self) -> libc::pid_t {
        std::fs::read_to_string(&self.pid_file)
            .expect("the target wrote the PID file")
            .parse()
            .expect("the PID file contains a PID")
    }
}

fn is_running(pid: libc::pid_t) -> bool {
    // A killed process may linger as a zombie until it's reaped by whoever adopted it.
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        let state = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next());
        return !matches!(state, Some('Z' | 'X'));
    }
    // SAFETY: signal 0 only checks whether the process exists.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[track_caller]
fn assert_gone(pid: libc::pid_t) {
    // SIGKILL is delivered asynchronously.
    let start = Instant::now();
    while is_running(pid) {
        if start.elapsed() > Duration::from_secs(5) {
            panic!("process {pid} started by the target is still running");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_started_processes_end_with_their_case() {
    let child = SpawnChild::new("return");
    let result = FixtureRun::default()
        .run(&SpawnChild::spec(), vec![child.case(json!("returned"))])
        .unwrap();

    assert_eq!(
        result.get(&CaseInput::new(child.input.clone())).map(|o| o.kind()),
        Some(OutcomeKind::Success)
    );
    assert_gone(child.child_pid());
}

#[test]
fn test_timeout_kills_started_processes() {
    let child = SpawnChild::new("spin");
    let result = FixtureRun::with_timeout(Duration::from_secs(2))
        .run(&SpawnChild::spec(), vec![child.case(json!(null))])
        .unwrap();

    assert_eq!(
        result.get(&CaseInput::new(child.input.clone())),
        Some(&ExecutionOutcome::Timeout {
            limit: TimeoutLimit::new(Duration::from_secs(2)).unwrap(),
        })
    );
    assert_gone(child.child_pid());
}

#[test]
fn test_crash_with_inherited_stderr_returns_promptly() {
    let child = SpawnChild::new("abort");
    let start = Instant::now();
    let result = FixtureRun::with_timeout(Duration::from_secs(1))
        .run(&SpawnChild::spec(), vec![child.case(json!(null))])
        .unwrap();
    let elapsed = start.elapsed();

    match result.get(&CaseInput::new(child.input.clone())) {
        Some(ExecutionOutcome::Crash { diagnostic_trace }) => {
            assert!(diagnostic_trace.contains("SIGABRT"), "trace: {diagnostic_trace}");
        }
        other => panic!("expected crash, found {other:?}"),
    }
    // The sleep holds the worker's stderr open for 300 seconds unless it's killed.
    assert!(elapsed < Duration::from_secs(10), "elapsed: {elapsed:?}");
    assert_gone(child.child_pid());
}

#[test]
fn test_stderr_held_outside_process_group() {
    let child = SpawnChild::new("detach-abort");
    let start = Instant::now();
    let result = FixtureRun::with_timeout(Duration::from_secs(1))
        .run(&SpawnChild::spec(), vec![child.case(json!(null))])
        .unwrap();
    let elapsed = start.elapsed();

    // This process is outside the worker's process group, so clean it up here.
    let pid = child.child_pid();
    // SAFETY: kill has no memory safety requirements.
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }

    assert_eq!(
        result.get(&CaseInput::new(child.input.clone())).map(|o| o.kind()),
        Some(OutcomeKind::Crash)
    );
    assert!(elapsed < Duration::from_secs(10), "elapsed: {elapsed:?}");
}
