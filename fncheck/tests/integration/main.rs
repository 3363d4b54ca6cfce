// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `fncheck` binary.
//!
//! Each test runs the binary as a subprocess. Workers are the same binary, started through its
//! hidden worker subcommand.

use camino::Utf8Path;
use camino_tempfile::{Utf8TempDir, tempdir};
use camino_tempfile_ext::prelude::*;
use fncheck_metadata::FncheckExitCode;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::process::Output;
use test_case::test_case;

struct CliOutput {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CliOutput {
    fn from_output(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8(output.stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(output.stderr).expect("stderr is UTF-8"),
        }
    }

    /// Returns stdout with the elapsed times of successful cases replaced.
    fn redacted_stdout(&self) -> String {
        self.stdout
            .lines()
            .map(|line| match line.split_once(" in Time ") {
                Some((prefix, _)) if line.starts_with("Test Success") => {
                    format!("{prefix} in Time [ELAPSED]\n")
                }
                _ => format!("{line}\n"),
            })
            .collect()
    }
}

impl std::fmt::Display for CliOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "exit code: {:?}\n--- stdout ---\n{}\n--- stderr ---\n{}",
            self.exit_code, self.stdout, self.stderr
        )
    }
}

/// Runs `fncheck` in `cwd` with a controlled environment.
fn fncheck(cwd: &Utf8Path, args: &[&str]) -> CliOutput {
    let output = duct::cmd(env!("CARGO_BIN_EXE_fncheck"), args)
        .dir(cwd)
        .env("FNCHECK_COLOR", "never")
        .env_remove("FNCHECK_LOG")
        .env_remove("FNCHECK_TIMEOUT")
        .env_remove("FNCHECK_SHOW_TARGET_OUTPUT")
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .expect("fncheck ran");
    CliOutput::from_output(output)
}

fn abbreviate_args<'a>(cases: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "run",
        "--module",
        "abbreviate_name",
        "--function",
        "abbreviate_name",
    ];
    for case in cases {
        args.extend(["--case", case]);
    }
    args
}

fn empty_dir() -> Utf8TempDir {
    tempdir().expect("temp dir created")
}

#[test]
fn test_all_pass() {
    let dir = empty_dir();
    let output = fncheck(
        dir.path(),
        &abbreviate_args(&["Gokul Guna=G. Guna", "Haran Raj Kumar=H. R. Kumar"]),
    );

    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    insta::assert_snapshot!(output.redacted_stdout(), @r"
    Test Success for Input : Gokul Guna Output G. Guna in Time [ELAPSED]
    Test Success for Input : Haran Raj Kumar Output H. R. Kumar in Time [ELAPSED]
    Overall : Pass 2 Out of 2 : Success Rate = 100.00
    ");
}

#[test]
fn test_mismatch_fails_run() {
    let dir = empty_dir();
    let output = fncheck(
        dir.path(),
        &abbreviate_args(&["Gokul Guna=G. Guna", "Cher=C."]),
    );

    assert_eq!(
        output.exit_code,
        Some(FncheckExitCode::TEST_RUN_FAILED),
        "{output}"
    );
    insta::assert_snapshot!(output.redacted_stdout(), @r"
    Test Failed for Input : Cher Got : Cher Expected : C.
    Test Success for Input : Gokul Guna Output G. Guna in Time [ELAPSED]
    Overall : Pass 1 Out of 2 : Success Rate = 50.00
    ");
}

#[test_case(
    &["run", "--module", "nonexistent", "--function", "abbreviate_name", "--case", "a=b"],
    "can't find module `nonexistent`"
    ; "missing module"
)]
#[test_case(
    &["run", "--module", "abbreviate_name", "--function", "shorten", "--case", "a=b"],
    "function `shorten` not found in module `abbreviate_name`"
    ; "missing function"
)]
fn test_load_failure(args: &[&str], message: &str) {
    let dir = empty_dir();
    let output = fncheck(dir.path(), args);

    assert_eq!(output.exit_code, Some(FncheckExitCode::LOAD_FAILED), "{output}");
    assert_eq!(output.stdout, format!("{message}\nNo tests were run!\n"));
}

#[test]
fn test_empty_table() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &abbreviate_args(&[]));

    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    assert_eq!(
        output.stdout,
        "No tests given but target abbreviate_name::abbreviate_name loaded without errors\n"
    );
}

#[test]
fn test_config_file_in_cwd() {
    let dir = empty_dir();
    dir.child("fncheck.toml")
        .write_str(indoc! {r#"
            [target]
            module = "arith"
            function = "mult"

            [run]
            timeout = "1s"

            [[cases]]
            input = [3, 4]
            expected = 12

            [[cases]]
            input = [2, 5]
            expected = 11
        "#})
        .unwrap();

    let output = fncheck(dir.path(), &["run"]);
    assert_eq!(
        output.exit_code,
        Some(FncheckExitCode::TEST_RUN_FAILED),
        "{output}"
    );
    insta::assert_snapshot!(output.redacted_stdout(), @r"
    Test Failed for Input : [2,5] Got : 10 Expected : 11
    Test Success for Input : [3,4] Output 12 in Time [ELAPSED]
    Overall : Pass 1 Out of 2 : Success Rate = 50.00
    ");
}

#[test]
fn test_explicit_config_file() {
    let dir = empty_dir();
    let config_file = dir.child("custom.toml");
    config_file
        .write_str(indoc! {r#"
            [target]
            module = "abbreviate_name"
            function = "abbreviate_name"

            [[cases]]
            input = "Gokul Guna"
            expected = "G. Guna"
        "#})
        .unwrap();

    // Command-line cases are appended to the ones in the file.
    let output = fncheck(
        dir.path(),
        &[
            "run",
            "--config-file",
            config_file.as_str(),
            "--case",
            "Cher=Cher",
        ],
    );
    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    assert!(
        output
            .stdout
            .ends_with("Overall : Pass 2 Out of 2 : Success Rate = 100.00\n"),
        "{output}"
    );
}

#[test]
fn test_duplicate_case_rejected() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &abbreviate_args(&["Cher=Cher", "Cher=C."]));

    assert_eq!(output.exit_code, Some(FncheckExitCode::SETUP_ERROR), "{output}");
    assert_eq!(output.stdout, "");
    assert!(
        output
            .stderr
            .contains("error: input `Cher` appears more than once in the test table"),
        "{output}"
    );
}

#[test]
fn test_target_output_suppressed_by_default() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &abbreviate_args(&["Cher=Cher"]));

    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    assert!(!output.stdout.contains("abbreviating"), "{output}");
}

#[test]
fn test_show_target_output() {
    let dir = empty_dir();
    let mut args = abbreviate_args(&["Cher=Cher"]);
    args.push("--show-target-output");
    let output = fncheck(dir.path(), &args);

    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    assert!(output.stdout.contains("abbreviating \"Cher\"\n"), "{output}");
}

#[test]
fn test_no_target() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &["run", "--case", "a=b"]);

    assert_eq!(output.exit_code, Some(FncheckExitCode::SETUP_ERROR), "{output}");
    assert!(
        output.stderr.contains("error: no target to test"),
        "{output}"
    );
}

#[test]
fn test_invalid_timeout_in_config() {
    let dir = empty_dir();
    dir.child("fncheck.toml")
        .write_str("[run]\ntimeout = -1\n")
        .unwrap();

    let output = fncheck(dir.path(), &abbreviate_args(&["a=a"]));
    assert_eq!(output.exit_code, Some(FncheckExitCode::SETUP_ERROR), "{output}");
    assert!(
        output.stderr.contains("error: failed to parse fncheck config at"),
        "{output}"
    );
    assert!(
        output.stderr.contains("invalid timeout `-1`"),
        "{output}"
    );
}

#[test]
fn test_list() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &["list"]);

    assert_eq!(output.exit_code, Some(FncheckExitCode::OK), "{output}");
    insta::assert_snapshot!(output.stdout, @r"
    abbreviate_name::abbreviate_name (1 arg)
    arith::mult (1 arg)
    ");
}

#[test]
fn test_worker_without_request() {
    let dir = empty_dir();
    let output = fncheck(dir.path(), &["__fncheck-worker"]);

    assert_eq!(
        output.exit_code,
        Some(FncheckExitCode::WORKER_REQUEST_INVALID),
        "{output}"
    );
    assert!(output.stderr.contains("error: worker failed"), "{output}");
}
