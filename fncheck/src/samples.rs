// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targets built into the `fncheck` binary.

use fncheck_runner::target::TargetRegistry;

/// Returns the registry of built-in targets.
///
/// The worker subcommand resolves targets against this same registry.
pub(crate) fn sample_registry() -> TargetRegistry {
    let mut registry = TargetRegistry::new();
    registry
        .register_module("abbreviate_name", |m| {
            m.function("abbreviate_name", abbreviate_name);
            Ok(())
        })
        .register_module("arith", |m| {
            m.function("mult", |(a, b): (i64, i64)| a.wrapping_mul(b));
            Ok(())
        });
    registry
}

/// Abbreviates every name but the last to its initial: "Haran Raj Kumar" becomes "H. R. Kumar".
fn abbreviate_name(name: String) -> String {
    // Debug output, discarded unless --show-target-output is passed.
    println!("abbreviating {name:?}");

    let mut parts: Vec<&str> = name.split_whitespace().collect();
    let Some(last) = parts.pop() else {
        return String::new();
    };
    let mut abbreviated: Vec<String> = parts
        .iter()
        .filter_map(|part| part.chars().next())
        .map(|initial| format!("{initial}."))
        .collect();
    abbreviated.push(last.to_owned());
    abbreviated.join(" ")
}
