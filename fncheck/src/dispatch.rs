// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
    samples::sample_registry,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use fncheck_metadata::FncheckExitCode;
use fncheck_runner::{
    config::FncheckConfig,
    outcome::TimeoutLimit,
    reporter::{Report, render_load_error},
    runner::{TestEvent, TestRunnerBuilder},
    target::{TargetResolver, TargetSpec},
    test_table::TestCase,
    worker::{WorkerCommand, run_worker},
};
use std::io::Write;
use swrite::{SWrite, swriteln};
use tracing::{debug, info, warn};

/// Run a table of test cases against a function, each case in its own process.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style(), max_term_width = 100)]
pub struct FncheckApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl FncheckApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        match &self.command {
            Command::Worker => OutputContext::color_never_init(),
            Command::Run(_) | Command::List => self.output.init(),
        }
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Run(run_opts) => run_opts.exec(output_writer),
            Command::List => exec_list(output_writer),
            Command::Worker => {
                run_worker(&sample_registry())?;
                Ok(FncheckExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run test cases against a target
    ///
    /// Cases come from the config file ([[cases]] tables) and from --case arguments. Each case
    /// runs in a separate process. The report is printed to stdout.
    Run(RunOpts),

    /// List the targets built into fncheck
    List,

    /// Private command, used to run a single case in a worker process.
    #[command(name = WorkerCommand::SUBCOMMAND_NAME, hide = true)]
    Worker,
}

#[derive(Debug, Default, Args)]
struct ConfigOpts {
    /// Config file [default: fncheck.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, cwd: &Utf8Path) -> Result<FncheckConfig> {
        let config = FncheckConfig::from_sources(self.config_file.as_deref(), cwd)?;
        if !config.unknown_keys().is_empty() {
            let keys: Vec<_> = config.unknown_keys().iter().map(|key| key.as_str()).collect();
            warn!(
                "ignoring unknown configuration keys in `{}`: {}",
                config.config_file(),
                keys.join(", ")
            );
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
struct RunOpts {
    #[clap(flatten)]
    config_opts: ConfigOpts,

    /// Module containing the target [default: from [target] in the config file]
    #[arg(long, value_name = "NAME")]
    module: Option<String>,

    /// Function to test [default: from [target] in the config file]
    #[arg(long, value_name = "NAME")]
    function: Option<String>,

    /// Deadline for each case, in seconds [default: from the config file, or 2]
    #[arg(long, value_name = "SECS", env = "FNCHECK_TIMEOUT")]
    timeout: Option<TimeoutLimit>,

    /// Let the target write to standard output instead of discarding what it writes
    #[arg(long, env = "FNCHECK_SHOW_TARGET_OUTPUT")]
    show_target_output: bool,

    /// Add a case with a string input and a string expected output
    #[arg(long = "case", value_name = "INPUT=EXPECTED")]
    cases: Vec<String>,
}

impl RunOpts {
    fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let cwd = current_dir_utf8()?;
        let mut config = self.config_opts.make_config(&cwd)?;

        let spec = self.target_spec(config.target()).ok_or_else(|| {
            ExpectedError::TargetNotConfigured {
                config_file: config.config_file().to_owned(),
            }
        })?;
        for arg in &self.cases {
            config.table_mut().insert(parse_case_arg(arg)?)?;
        }

        let registry = sample_registry();
        let target = match registry.resolve(&spec) {
            Ok(target) => target,
            Err(error) => {
                debug!("target {spec} failed to load: {error}");
                write_stdout(output_writer, &render_load_error(&error))?;
                return Ok(FncheckExitCode::LOAD_FAILED);
            }
        };

        let mut builder = TestRunnerBuilder::default();
        builder
            .set_timeout(self.timeout.unwrap_or(config.timeout()))
            .set_suppress_target_output(if self.show_target_output {
                false
            } else {
                config.suppress_target_output()
            });
        let runner = builder.build()?;

        let result = runner.execute(&target, config.table(), |event| match event {
            TestEvent::RunStarted {
                spec,
                case_count,
                limit,
                ..
            } => {
                info!(
                    "running {case_count} {} against {spec} (timeout: {limit}s)",
                    if case_count == 1 { "case" } else { "cases" }
                );
            }
            TestEvent::CaseStarted { index, input } => {
                debug!("case {index} starting: {input}");
            }
            TestEvent::CaseFinished {
                index,
                outcome,
                elapsed,
                ..
            } => {
                debug!("case {index} finished: {} in {elapsed:?}", outcome.kind());
            }
            TestEvent::RunFinished {
                stats,
                end_time,
                elapsed,
                ..
            } => {
                debug!(
                    "run finished at {end_time}: {} of {} passed in {elapsed:?}",
                    stats.passed, stats.total
                );
            }
        });

        let report = Report::new(&spec, config.table(), &result);
        report
            .write_to(&mut output_writer.stdout_writer())
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        if report.stats().is_success() {
            Ok(FncheckExitCode::OK)
        } else {
            Ok(FncheckExitCode::TEST_RUN_FAILED)
        }
    }

    /// Arguments on the command line take precedence over the config file.
    fn target_spec(&self, configured: Option<&TargetSpec>) -> Option<TargetSpec> {
        let module = self
            .module
            .clone()
            .or_else(|| configured.map(|spec| spec.module.clone()))?;
        let function = self
            .function
            .clone()
            .or_else(|| configured.map(|spec| spec.function.clone()))?;
        Some(TargetSpec::new(module, function))
    }
}

fn exec_list(output_writer: &mut OutputWriter) -> Result<i32> {
    let registry = sample_registry();
    let mut out = String::new();
    for module_name in registry.module_names() {
        match registry.load_module(module_name) {
            Ok(module) => {
                for (function, arity) in module.functions() {
                    let args = if arity == 1 { "arg" } else { "args" };
                    swriteln!(out, "{}::{function} ({arity} {args})", module.name());
                }
            }
            Err(error) => swriteln!(out, "{module_name}: {error}"),
        }
    }
    write_stdout(output_writer, &out)?;
    Ok(FncheckExitCode::OK)
}

fn parse_case_arg(arg: &str) -> Result<TestCase> {
    let (input, expected) = arg
        .split_once('=')
        .ok_or_else(|| ExpectedError::CaseArgInvalid {
            arg: arg.to_owned(),
        })?;
    Ok(TestCase::new(input, expected))
}

fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
            path: err.into_path_buf(),
        })
}

fn write_stdout(output_writer: &mut OutputWriter, contents: &str) -> Result<()> {
    let mut writer = output_writer.stdout_writer();
    writer
        .write_all(contents.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|err| ExpectedError::WriteOutputError { err })
}
