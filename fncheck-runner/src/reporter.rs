// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering the summary of a run.
//!
//! The line formats produced here are relied upon by tooling that grades runs, so they are kept
//! stable: every line is produced by exactly one `swriteln!` below.

use crate::{
    errors::LoadError,
    outcome::{ExecutionOutcome, OutcomeKind, RunResult, RunStats},
    target::TargetSpec,
    test_table::TestTable,
};
use std::io;
use swrite::{SWrite, swriteln};

/// The summary of a run that loaded its target successfully.
#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    spec: &'a TargetSpec,
    table: &'a TestTable,
    result: &'a RunResult,
}

impl<'a> Report<'a> {
    /// Creates a new report.
    pub fn new(spec: &'a TargetSpec, table: &'a TestTable, result: &'a RunResult) -> Self {
        Self {
            spec,
            table,
            result,
        }
    }

    /// Returns statistics for the run.
    pub fn stats(&self) -> RunStats {
        self.result.stats()
    }

    /// Renders the report.
    ///
    /// Crashes come first, then mismatches, timeouts and successes, each group in table order.
    /// The final line is the overall pass rate.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if self.table.is_empty() {
            swriteln!(
                out,
                "No tests given but target {} loaded without errors",
                self.spec
            );
            return out;
        }

        for kind in [
            OutcomeKind::Crash,
            OutcomeKind::Mismatch,
            OutcomeKind::Timeout,
            OutcomeKind::Success,
        ] {
            for (input, expected) in self.table.iter() {
                let Some(outcome) = self.result.get(input) else {
                    continue;
                };
                if outcome.kind() != kind {
                    continue;
                }

                match outcome {
                    ExecutionOutcome::Crash { diagnostic_trace } => {
                        swriteln!(
                            out,
                            "Test Crashed for Input : {input} StackTrace = {diagnostic_trace}"
                        );
                    }
                    ExecutionOutcome::Mismatch { expected, actual } => {
                        swriteln!(
                            out,
                            "Test Failed for Input : {input} Got : {actual} Expected : {expected}"
                        );
                    }
                    ExecutionOutcome::Timeout { limit } => {
                        swriteln!(out, "Test TimeOut for Input : {input} TimeOutLimit: {limit}");
                    }
                    ExecutionOutcome::Success { duration, .. } => {
                        swriteln!(
                            out,
                            "Test Success for Input : {input} Output {expected} in Time {:.3}",
                            duration.as_secs_f64()
                        );
                    }
                }
            }
        }

        let stats = self.stats();
        // The table is non-empty here, so there is a pass rate.
        let rate = stats.pass_rate().unwrap_or_default();
        swriteln!(
            out,
            "Overall : Pass {} Out of {} : Success Rate = {rate:.2}",
            stats.passed,
            stats.total,
        );

        out
    }

    /// Writes the rendered report.
    pub fn write_to(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writer.write_all(self.render().as_bytes())?;
        writer.flush()
    }
}

/// Renders the summary of a run whose target failed to load.
pub fn render_load_error(error: &LoadError) -> String {
    let mut out = String::new();
    swriteln!(out, "{error}");
    swriteln!(out, "No tests were run!");
    out
}
