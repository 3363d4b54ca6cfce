// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by fncheck.

use crate::value::CaseInput;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, io};
use thiserror::Error;

/// A fatal error produced while resolving the target, before any case runs.
///
/// If this is returned, no test case was executed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    /// No module with this name is registered.
    #[error("can't find module `{module}`")]
    ModuleNotFound {
        /// The name of the module.
        module: String,
    },

    /// The module's initializer reported an error.
    #[error("module `{module}` failed to load: {reason}")]
    ModuleInit {
        /// The name of the module.
        module: String,

        /// The reason reported by the module.
        reason: String,
    },

    /// The module does not contain a function with this name.
    #[error("function `{function}` not found in module `{module}`")]
    FunctionNotFound {
        /// The name of the module.
        module: String,

        /// The name of the function.
        function: String,
    },

    /// The function does not take the number of arguments the harness supplies.
    #[error("expecting {expected} args in `{function}` but found {actual}")]
    ArityMismatch {
        /// The name of the function.
        function: String,

        /// The number of arguments the harness supplies.
        expected: usize,

        /// The number of arguments the function declares.
        actual: usize,
    },
}

/// An error reported by a module initializer.
///
/// Returned by the closures passed to
/// [`TargetRegistry::register_module`](crate::target::TargetRegistry::register_module).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ModuleInitError {
    reason: String,
}

impl ModuleInitError {
    /// Creates a new module initialization error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// An error produced while calling a target inside the worker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TargetCallError {
    /// The input could not be converted into the target's argument type.
    #[error("input does not match the argument type of the target")]
    InvalidInput(#[source] serde_json::Error),

    /// The target's return value could not be converted into a JSON value.
    #[error("return value of the target could not be serialized")]
    InvalidOutput(#[source] serde_json::Error),

    /// The target reported a failure of its own.
    #[error("{0}")]
    Custom(String),
}

/// An error produced while building a test table.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestTableError {
    /// The same input was listed more than once.
    #[error("input `{input}` appears more than once in the test table")]
    DuplicateInput {
        /// The duplicated input.
        input: CaseInput,
    },
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse fncheck config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The timeout was zero, negative or not finite.
    #[error("invalid timeout `{input}`: must be a positive number of seconds")]
    InvalidTimeout {
        /// The value that was provided.
        input: String,
    },

    /// The cases did not form a valid test table.
    #[error(transparent)]
    TestTable(#[from] TestTableError),
}

/// An error parsing a timeout given on the command line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid timeout `{input}`: must be a positive number of seconds")]
pub struct TimeoutParseError {
    input: String,
}

impl TimeoutParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),

    /// The directory holding worker reports could not be created.
    #[error("error creating temporary directory for worker files")]
    TempDirCreate(#[source] io::Error),

    /// The worker program could not be determined.
    #[error("unable to determine the current executable to use as the worker program")]
    CurrentExe(#[source] io::Error),
}

/// An error produced when the worker process is started without a valid request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkerRequestError {
    /// A required environment variable was not set or was not valid UTF-8.
    #[error("worker environment variable `{name}` is missing or not UTF-8")]
    MissingVar {
        /// The name of the variable.
        name: &'static str,
    },

    /// The input file could not be read.
    #[error("error reading worker input from `{path}`")]
    InputRead {
        /// The path to the input file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The input was not valid JSON.
    #[error("worker input is not valid JSON")]
    InvalidInput(#[source] serde_json::Error),
}

/// An error produced while writing the worker's report.
#[derive(Debug, Error)]
#[error("error writing worker report to `{path}`")]
pub struct WorkerReportWriteError {
    path: Utf8PathBuf,
    #[source]
    err: atomicwrites::Error<io::Error>,
}

impl WorkerReportWriteError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, err: atomicwrites::Error<io::Error>) -> Self {
        Self {
            path: path.into(),
            err,
        }
    }
}

/// An error produced by [`run_worker`](crate::worker::run_worker).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkerError {
    /// The request could not be read.
    #[error(transparent)]
    Request(#[from] WorkerRequestError),

    /// The report could not be written.
    #[error(transparent)]
    ReportWrite(#[from] WorkerReportWriteError),
}

/// Displays an error along with its chain of sources, separated by `: `.
///
/// Used to build diagnostic traces out of errors that happen while running a case.
pub(crate) struct DisplayErrorChain<E>(pub(crate) E);

impl<E: std::error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
