// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying the outcome of each case.

use crate::{
    errors::TimeoutParseError,
    value::{CaseInput, CaseValue},
};
use indexmap::IndexMap;
use serde_json::Value;
use std::{fmt, str::FromStr, time::Duration};

/// The wall-clock deadline applied to every case.
///
/// Always positive and finite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeoutLimit(Duration);

impl TimeoutLimit {
    /// The deadline used when none is configured: 2 seconds.
    pub const DEFAULT: Self = Self(Duration::from_secs(2));

    /// Creates a new limit out of a duration. Returns `None` if the duration is zero.
    pub fn new(duration: Duration) -> Option<Self> {
        (!duration.is_zero()).then_some(Self(duration))
    }

    /// Creates a new limit out of a number of seconds. Returns `None` if `secs` is not a positive
    /// finite number.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).ok().and_then(Self::new)
        } else {
            None
        }
    }

    /// Returns the limit as a duration.
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl fmt::Display for TimeoutLimit {
    /// Displays the limit as a number of seconds, without a fractional part if it is whole.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.subsec_nanos() == 0 {
            write!(f, "{}", self.0.as_secs())
        } else {
            write!(f, "{}", self.0.as_secs_f64())
        }
    }
}

impl FromStr for TimeoutLimit {
    type Err = TimeoutParseError;

    /// Parses a positive number of seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(Self::from_secs_f64)
            .ok_or_else(|| TimeoutParseError::new(s))
    }
}

/// How the execution of a single case ended, before comparing against the expected value.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecuteStatus {
    /// The deadline elapsed and the worker was terminated.
    TimedOut {
        /// The deadline that elapsed.
        limit: TimeoutLimit,
    },

    /// The target panicked, returned an error or the worker died.
    Failed {
        /// A description of the failure.
        trace: String,
    },

    /// The target returned a value.
    Completed {
        /// The returned value.
        output: Value,

        /// How long the call took.
        duration: Duration,
    },
}

/// The final classification of one case.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionOutcome {
    /// The target returned the expected value within the deadline.
    Success {
        /// The value returned by the target.
        actual_output: CaseValue,

        /// How long the call took.
        duration: Duration,
    },

    /// The target returned within the deadline, but not the expected value.
    Mismatch {
        /// The expected value.
        expected: CaseValue,

        /// The value returned by the target.
        actual: CaseValue,
    },

    /// The target terminated abnormally.
    Crash {
        /// A description of the failure. Never empty.
        diagnostic_trace: String,
    },

    /// The target exceeded the deadline.
    Timeout {
        /// The deadline that elapsed.
        limit: TimeoutLimit,
    },
}

impl ExecutionOutcome {
    /// Returns the kind of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::Mismatch { .. } => OutcomeKind::Mismatch,
            Self::Crash { .. } => OutcomeKind::Crash,
            Self::Timeout { .. } => OutcomeKind::Timeout,
        }
    }

    /// Returns true if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// The kind of an [`ExecutionOutcome`], without the associated data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    /// See [`ExecutionOutcome::Success`].
    Success,
    /// See [`ExecutionOutcome::Mismatch`].
    Mismatch,
    /// See [`ExecutionOutcome::Crash`].
    Crash,
    /// See [`ExecutionOutcome::Timeout`].
    Timeout,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.pad("SUCCESS"),
            Self::Mismatch => f.pad("MISMATCH"),
            Self::Crash => f.pad("CRASH"),
            Self::Timeout => f.pad("TIMEOUT"),
        }
    }
}

/// Classifies a case.
///
/// A timeout takes precedence over a crash, which takes precedence over a mismatch, which takes
/// precedence over a success. Every case lands in exactly one of these.
pub fn classify(expected: &CaseValue, status: ExecuteStatus) -> ExecutionOutcome {
    match status {
        ExecuteStatus::TimedOut { limit } => ExecutionOutcome::Timeout { limit },
        ExecuteStatus::Failed { trace } => ExecutionOutcome::Crash {
            diagnostic_trace: non_empty_trace(trace),
        },
        ExecuteStatus::Completed { output, duration } => {
            let actual = CaseValue::new(output);
            if &actual == expected {
                ExecutionOutcome::Success {
                    actual_output: actual,
                    duration,
                }
            } else {
                ExecutionOutcome::Mismatch {
                    expected: expected.clone(),
                    actual,
                }
            }
        }
    }
}

fn non_empty_trace(trace: String) -> String {
    if trace.trim().is_empty() {
        "target terminated abnormally without a diagnostic".to_owned()
    } else {
        trace
    }
}

/// The outcome of every case in a run, keyed by input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunResult {
    outcomes: IndexMap<CaseInput, ExecutionOutcome>,
}

impl RunResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a case.
    ///
    /// Each case is recorded once. Recording an input twice indicates a bug in the runner.
    pub(crate) fn record(&mut self, input: CaseInput, outcome: ExecutionOutcome) {
        let previous = self.outcomes.insert(input, outcome);
        debug_assert!(previous.is_none(), "each case is recorded exactly once");
    }

    /// Returns the number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if no outcomes were recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns the outcome for an input.
    pub fn get(&self, input: &CaseInput) -> Option<&ExecutionOutcome> {
        self.outcomes.get(input)
    }

    /// Iterates over the outcomes in the order they were recorded.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&CaseInput, &ExecutionOutcome)> + '_ {
        self.outcomes.iter()
    }

    /// Returns statistics for this result.
    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats::default();
        for outcome in self.outcomes.values() {
            stats.add(outcome.kind());
        }
        stats
    }
}

impl FromIterator<(CaseInput, ExecutionOutcome)> for RunResult {
    fn from_iter<T: IntoIterator<Item = (CaseInput, ExecutionOutcome)>>(iter: T) -> Self {
        let mut result = Self::new();
        for (input, outcome) in iter {
            result.record(input, outcome);
        }
        result
    }
}

/// Counts of each kind of outcome in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// The total number of cases.
    pub total: usize,

    /// The number of successes.
    pub passed: usize,

    /// The number of mismatches.
    pub mismatched: usize,

    /// The number of crashes.
    pub crashed: usize,

    /// The number of timeouts.
    pub timed_out: usize,
}

impl RunStats {
    pub(crate) fn add(&mut self, kind: OutcomeKind) {
        self.total += 1;
        match kind {
            OutcomeKind::Success => self.passed += 1,
            OutcomeKind::Mismatch => self.mismatched += 1,
            OutcomeKind::Crash => self.crashed += 1,
            OutcomeKind::Timeout => self.timed_out += 1,
        }
    }

    /// Returns the percentage of cases that succeeded, or `None` if there were no cases.
    pub fn pass_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| 100.0 * self.passed as f64 / self.total as f64)
    }

    /// Returns true if every case succeeded. An empty run is a success.
    pub fn is_success(&self) -> bool {
        self.passed == self.total
    }
}
