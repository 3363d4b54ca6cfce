// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use fncheck_metadata::FncheckExitCode;
use fncheck_runner::errors::*;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected failure of fncheck itself, as opposed to a failure of the target under test.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("no target configured")]
    TargetNotConfigured { config_file: Utf8PathBuf },
    #[error("invalid --case argument")]
    CaseArgInvalid { arg: String },
    #[error("test table error")]
    TestTableError {
        #[from]
        err: TestTableError,
    },
    #[error("test runner build error")]
    RunnerBuildError {
        #[from]
        err: RunnerBuildError,
    },
    #[error("worker error")]
    WorkerError {
        #[from]
        err: WorkerError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::TargetNotConfigured { .. }
            | Self::CaseArgInvalid { .. }
            | Self::TestTableError { .. }
            | Self::RunnerBuildError { .. } => FncheckExitCode::SETUP_ERROR,
            Self::WorkerError { .. } => FncheckExitCode::WORKER_REQUEST_INVALID,
            Self::WriteOutputError { .. } => FncheckExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                tracing::error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                tracing::error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse fncheck config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::TargetNotConfigured { config_file } => {
                tracing::error!(
                    "no target to test: pass --module and --function, or add a [target] table \
                     to `{}`",
                    config_file.style(styles.bold)
                );
                None
            }
            Self::CaseArgInvalid { arg } => {
                tracing::error!(
                    "invalid --case `{}`: expected INPUT=EXPECTED",
                    arg.style(styles.bold)
                );
                None
            }
            Self::TestTableError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::RunnerBuildError { err } => {
                tracing::error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::WorkerError { err } => {
                tracing::error!("worker failed");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                tracing::error!("error writing report to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
