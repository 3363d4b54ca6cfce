// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker processes.
//!
//! Every case runs in a separate process: the worker. The worker is the program using fncheck,
//! re-executed with the [`WorkerCommand::SUBCOMMAND_NAME`] subcommand. Programs that use fncheck
//! must check for this subcommand at startup and hand control to [`run_worker`] when it is
//! present.
//!
//! The request travels through environment variables, except for the input which is read from a
//! [`WorkerFiles`] input file. The worker resolves the target, calls it under `catch_unwind` and
//! writes a single [`WorkerReport`] as JSON to a report file. If the worker
//! dies without writing a report (an abort, a fatal signal, a stack overflow), the runner builds
//! the diagnostic trace out of the exit status and whatever the worker wrote to standard error.

use crate::{
    errors::{
        DisplayErrorChain, RunnerBuildError, WorkerError, WorkerReportWriteError,
        WorkerRequestError,
    },
    target::{ResolvedTarget, TargetResolver, TargetSpec},
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
    cell::{Cell, RefCell},
    ffi::OsString,
    io,
    panic::{self, AssertUnwindSafe, PanicHookInfo},
    path::{Path, PathBuf},
    process::Command,
    sync::Once,
    time::Duration,
};

/// The program and arguments used to start worker processes.
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// The name of the worker subcommand.
    pub const SUBCOMMAND_NAME: &'static str = "__fncheck-worker";

    /// Returns a worker command that re-executes the current program.
    pub fn current_exe() -> Result<Self, RunnerBuildError> {
        let program = std::env::current_exe().map_err(RunnerBuildError::CurrentExe)?;
        Ok(Self::new(program))
    }

    /// Returns a worker command that runs the given program with the worker subcommand.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![Self::SUBCOMMAND_NAME.into()],
        }
    }

    /// Returns the program that is executed.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns true if the given command-line arguments (excluding the program name) request the
    /// worker.
    pub fn is_worker_invocation<I, S>(args: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        args.into_iter()
            .next()
            .is_some_and(|arg| arg.as_ref() == Self::SUBCOMMAND_NAME)
    }

    pub(crate) fn to_command(&self, request: &WorkerRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        request.apply_env(&mut cmd);
        cmd
    }
}

/// The files through which the runner and the worker for one case communicate.
///
/// The input is passed through a file rather than the environment, since environment variables
/// are limited in size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerFiles {
    input_path: Utf8PathBuf,
    report_path: Utf8PathBuf,
}

impl WorkerFiles {
    /// Returns the files for the case at `index`, placed in `dir`.
    pub fn for_case(dir: &Utf8Path, index: usize) -> Self {
        Self {
            input_path: dir.join(format!("case-{index}.input.json")),
            report_path: dir.join(format!("case-{index}.report.json")),
        }
    }

    /// Returns the path the input is written to, as JSON.
    pub fn input_path(&self) -> &Utf8Path {
        &self.input_path
    }

    /// Returns the path the report is written to.
    pub fn report_path(&self) -> &Utf8Path {
        &self.report_path
    }
}

/// A request to run one case, sent from the runner to a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerRequest {
    spec: TargetSpec,
    files: WorkerFiles,
}

impl WorkerRequest {
    const MODULE_VAR: &'static str = "FNCHECK_WORKER_MODULE";
    const FUNCTION_VAR: &'static str = "FNCHECK_WORKER_FUNCTION";
    const INPUT_PATH_VAR: &'static str = "FNCHECK_WORKER_INPUT_PATH";
    const REPORT_PATH_VAR: &'static str = "FNCHECK_WORKER_REPORT_PATH";

    pub(crate) fn new(spec: TargetSpec, files: WorkerFiles) -> Self {
        Self { spec, files }
    }

    /// Reads a request from the environment of the current process.
    pub fn from_env() -> Result<Self, WorkerRequestError> {
        let module = read_var(Self::MODULE_VAR)?;
        let function = read_var(Self::FUNCTION_VAR)?;
        let input_path = read_var(Self::INPUT_PATH_VAR)?;
        let report_path = read_var(Self::REPORT_PATH_VAR)?;
        Ok(Self {
            spec: TargetSpec::new(module, function),
            files: WorkerFiles {
                input_path: input_path.into(),
                report_path: report_path.into(),
            },
        })
    }

    /// Returns the target to call.
    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    /// Returns the files used by this request.
    pub fn files(&self) -> &WorkerFiles {
        &self.files
    }

    fn apply_env(&self, cmd: &mut Command) {
        cmd.env(Self::MODULE_VAR, &self.spec.module)
            .env(Self::FUNCTION_VAR, &self.spec.function)
            .env(Self::INPUT_PATH_VAR, &self.files.input_path)
            .env(Self::REPORT_PATH_VAR, &self.files.report_path);
    }
}

fn read_var(name: &'static str) -> Result<String, WorkerRequestError> {
    std::env::var(name).map_err(|_| WorkerRequestError::MissingVar { name })
}

/// The result of running one case, written by the worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum WorkerReport {
    /// The target returned normally.
    Ok {
        /// The value the target returned.
        output: Value,

        /// How long the call took.
        duration: Duration,
    },

    /// The target panicked or returned an error.
    Failed {
        /// A description of the failure.
        trace: String,
    },
}

impl WorkerReport {
    /// Writes this report atomically to the given path.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), WorkerReportWriteError> {
        atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite)
            .write(|file| serde_json::to_writer(file, self).map_err(io::Error::from))
            .map_err(|err| WorkerReportWriteError::new(path, err))
    }

    /// Reads a report written by a worker.
    ///
    /// Returns `Ok(None)` if no report was written.
    pub(crate) fn read_from(path: &Utf8Path) -> io::Result<Option<Self>> {
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(io::Error::from)
    }
}

/// Serves a worker request read from the environment.
///
/// Call this from `main` when [`WorkerCommand::is_worker_invocation`] returns true. The target
/// is resolved with the given resolver, which must register the same targets the runner process
/// does.
///
/// Panics and errors in the target are reported through the report file, not through the return
/// value: an error is only returned if the request is invalid or the report can't be written.
pub fn run_worker(resolver: &impl TargetResolver) -> Result<(), WorkerError> {
    let request = WorkerRequest::from_env()?;
    let report = serve(resolver, &request);
    report.write_to(request.files().report_path())?;
    Ok(())
}

fn serve(resolver: &impl TargetResolver, request: &WorkerRequest) -> WorkerReport {
    let target = match resolver.resolve(request.spec()) {
        Ok(target) => target,
        Err(error) => {
            // The runner resolved this target before starting the worker, so this only happens if
            // the worker program registers different targets.
            return WorkerReport::Failed {
                trace: format!("worker could not load target {}: {error}", request.spec()),
            };
        }
    };
    let input = match read_input(request.files().input_path()) {
        Ok(input) => input,
        Err(error) => {
            return WorkerReport::Failed {
                trace: DisplayErrorChain(error).to_string(),
            };
        }
    };

    invoke(&target, input)
}

fn read_input(path: &Utf8Path) -> Result<Value, WorkerRequestError> {
    let contents = std::fs::read(path).map_err(|err| WorkerRequestError::InputRead {
        path: path.to_owned(),
        err,
    })?;
    serde_json::from_slice(&contents).map_err(WorkerRequestError::InvalidInput)
}

/// Calls a target in the current process, catching panics.
///
/// The duration only covers the call itself.
pub fn invoke(target: &ResolvedTarget, input: Value) -> WorkerReport {
    install_panic_hook();

    let stopwatch = crate::time::stopwatch();
    CAPTURING.with(|capturing| capturing.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(|| target.call(input)));
    CAPTURING.with(|capturing| capturing.set(false));
    let duration = stopwatch.snapshot().duration;

    match result {
        Ok(Ok(output)) => WorkerReport::Ok { output, duration },
        Ok(Err(error)) => WorkerReport::Failed {
            trace: format!(
                "target {} returned an error: {}",
                target.spec(),
                DisplayErrorChain(error)
            ),
        },
        Err(payload) => {
            let trace = CAPTURED_PANIC
                .with(|captured| captured.borrow_mut().take())
                .unwrap_or_else(|| format!("panicked: {}", payload_message(payload.as_ref())));
            WorkerReport::Failed { trace }
        }
    }
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static CAPTURED_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

// Panics raised by a target are recorded rather than printed. Panics anywhere else (including
// threads spawned by the target) go to the previously installed hook.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(|capturing| capturing.get()) {
                let trace = format_panic(info);
                CAPTURED_PANIC.with(|captured| *captured.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

fn format_panic(info: &PanicHookInfo<'_>) -> String {
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");
    let message = payload_message(info.payload());
    let mut trace = match info.location() {
        Some(location) => format!("thread '{thread_name}' panicked at {location}:\n{message}"),
        None => format!("thread '{thread_name}' panicked:\n{message}"),
    };

    // Respects RUST_BACKTRACE and RUST_LIB_BACKTRACE.
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        trace.push_str("\nstack backtrace:\n");
        trace.push_str(&backtrace.to_string());
    }
    trace
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<dyn Any>"
    }
}
