// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::FixtureRun;
use fncheck_runner::{errors::LoadError, target::TargetSpec, test_table::TestCase};
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test_case(
    "nonexistent", "abbreviate_name",
    LoadError::ModuleNotFound { module: "nonexistent".to_owned() }
    ; "missing module"
)]
#[test_case(
    "broken", "anything",
    LoadError::ModuleInit {
        module: "broken".to_owned(),
        reason: "unterminated string on line 3".to_owned(),
    }
    ; "module fails to initialize"
)]
#[test_case(
    "abbreviate_name", "shorten",
    LoadError::FunctionNotFound {
        module: "abbreviate_name".to_owned(),
        function: "shorten".to_owned(),
    }
    ; "missing function"
)]
#[test_case(
    "arith", "add",
    LoadError::ArityMismatch { function: "add".to_owned(), expected: 1, actual: 2 }
    ; "wrong arity"
)]
fn test_load_error(module: &str, function: &str, expected: LoadError) {
    let spec = TargetSpec::new(module, function);
    let error = FixtureRun::default()
        .run(&spec, vec![TestCase::new("Gokul Guna", "G. Guna")])
        .expect_err("target fails to load");
    assert_eq!(error, expected);
}

#[test]
fn test_load_error_report() {
    let rendered = FixtureRun::default().render(
        &TargetSpec::new("nonexistent", "abbreviate_name"),
        vec![TestCase::new("Gokul Guna", "G. Guna")],
    );
    insta::assert_snapshot!(rendered, @r"
    can't find module `nonexistent`
    No tests were run!
    ");
}
