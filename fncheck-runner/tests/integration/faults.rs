// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::FixtureRun;
use fncheck_runner::{
    outcome::{ExecutionOutcome, OutcomeKind, TimeoutLimit},
    target::TargetSpec,
    test_table::TestCase,
    value::CaseInput,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};

fn faults(function: &str) -> TargetSpec {
    TargetSpec::new("faults", function)
}

#[track_caller]
fn single_crash_trace(run: &FixtureRun, spec: &TargetSpec, input: serde_json::Value) -> String {
    let result = run
        .run(spec, vec![TestCase::new(input.clone(), json!(null))])
        .unwrap();
    match result.get(&CaseInput::new(input)) {
        Some(ExecutionOutcome::Crash { diagnostic_trace }) => diagnostic_trace.clone(),
        other => panic!("expected crash for {spec}, found {other:?}"),
    }
}

#[test]
fn test_infinite_loop_times_out() {
    let run = FixtureRun::with_timeout(Duration::from_secs(1));
    let start = Instant::now();
    let result = run
        .run(&faults("spin"), vec![TestCase::new(json!(0), json!(0))])
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(
        result.get(&CaseInput::new(json!(0))),
        Some(&ExecutionOutcome::Timeout {
            limit: TimeoutLimit::new(Duration::from_secs(1)).unwrap(),
        })
    );
    assert!(elapsed >= Duration::from_secs(1), "elapsed: {elapsed:?}");
    // Generous bound: the worker is killed and reaped right after the deadline.
    assert!(elapsed < Duration::from_secs(10), "elapsed: {elapsed:?}");

    let rendered = run.render(&faults("spin"), vec![TestCase::new(json!(0), json!(0))]);
    assert!(
        rendered.starts_with("Test TimeOut for Input : 0 TimeOutLimit: 1\n"),
        "rendered: {rendered}"
    );
}

#[test]
fn test_slow_case_within_deadline() {
    let run = FixtureRun::with_timeout(Duration::from_secs(5));
    let result = run
        .run(&faults("sleep_ms"), vec![TestCase::new(json!(200), json!(200))])
        .unwrap();
    match result.get(&CaseInput::new(json!(200))) {
        Some(ExecutionOutcome::Success { duration, .. }) => {
            assert!(*duration >= Duration::from_millis(200), "duration: {duration:?}");
        }
        other => panic!("expected success, found {other:?}"),
    }
}

#[test]
fn test_panic_is_crash() {
    let trace = single_crash_trace(&FixtureRun::default(), &faults("panic"), json!("Gokul"));
    assert!(trace.contains("panicked at"), "trace: {trace}");
    assert!(trace.contains("refusing to handle Gokul"), "trace: {trace}");
}

#[test]
fn test_abort_is_crash() {
    let trace = single_crash_trace(&FixtureRun::default(), &faults("abort"), json!(null));
    assert!(
        trace.starts_with("worker ") && trace.contains("without reporting a result"),
        "trace: {trace}"
    );
    #[cfg(unix)]
    assert!(trace.contains("SIGABRT"), "trace: {trace}");
}

#[test]
fn test_stack_overflow_is_crash() {
    let trace = single_crash_trace(&FixtureRun::default(), &faults("stack_overflow"), json!(0));
    assert!(trace.contains("overflowed its stack"), "trace: {trace}");
}

#[test]
fn test_exit_without_result_is_crash() {
    let trace = single_crash_trace(&FixtureRun::default(), &faults("exit"), json!(0));
    assert_eq!(
        trace,
        "worker exited with exit code 0 without reporting a result"
    );
}

#[test]
fn test_bad_input_is_crash() {
    // `sleep_ms` takes a number.
    let trace = single_crash_trace(&FixtureRun::default(), &faults("sleep_ms"), json!("soon"));
    assert!(
        trace.contains("input does not match the argument type"),
        "trace: {trace}"
    );
}

#[test]
fn test_faults_do_not_stop_the_run() {
    // Every case runs against the same target, so vary the behavior through the input: `sleep_ms`
    // crashes on non-numbers, times out on long sleeps and mismatches on wrong expectations.
    let run = FixtureRun::with_timeout(Duration::from_secs(1));
    let result = run
        .run(
            &faults("sleep_ms"),
            vec![
                TestCase::new(json!("crash"), json!(0)),
                TestCase::new(json!(60_000), json!(60_000)),
                TestCase::new(json!(1), json!(2)),
                TestCase::new(json!(0), json!(0)),
            ],
        )
        .unwrap();

    let kinds: Vec<_> = result.iter().map(|(_, outcome)| outcome.kind()).collect();
    assert_eq!(
        kinds,
        [
            OutcomeKind::Crash,
            OutcomeKind::Timeout,
            OutcomeKind::Mismatch,
            OutcomeKind::Success,
        ]
    );
    let stats = result.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.pass_rate(), Some(25.0));
}
