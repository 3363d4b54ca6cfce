// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targets used by the integration tests.
//!
//! This file is shared between the `fixture-targets` worker binary and the integration tests, so
//! that the runner and its workers resolve targets against the same registry.

use fncheck_runner::{
    errors::{ModuleInitError, TargetCallError},
    target::{Target, TargetRegistry},
};
use serde_json::Value;
use std::{
    hint::black_box,
    process::{Command, Stdio},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

static CALLS: AtomicU64 = AtomicU64::new(0);

pub fn fixture_registry() -> TargetRegistry {
    let mut registry = TargetRegistry::new();
    registry
        .register_module("abbreviate_name", |m| {
            m.function("abbreviate_name", abbreviate_name)
                .function("always_wrong", |_: String| "Wrong");
            Ok(())
        })
        .register_module("faults", |m| {
            m.function("panic", |name: String| -> String {
                panic!("refusing to handle {name}");
            })
            .function("abort", |_: Value| -> Value { std::process::abort() })
            .function("stack_overflow", |depth: u64| recurse(depth))
            .function("spin", |_: Value| -> Value {
                loop {
                    std::hint::spin_loop();
                }
            })
            .function("sleep_ms", |ms: u64| {
                std::thread::sleep(Duration::from_millis(ms));
                ms
            })
            .function("exit", |code: i32| -> Value { std::process::exit(code) });
            Ok(())
        })
        .register_module("effects", |m| {
            m.function("noisy", |s: String| {
                println!("noise from the target: {s}");
                s
            })
            // Returns how many times it was called in this process.
            .function("count_calls", |_: Value| {
                CALLS.fetch_add(1, Ordering::SeqCst) + 1
            });
            Ok(())
        })
        .register_module("processes", |m| {
            m.function("spawn_child", spawn_child);
            Ok(())
        })
        .register_module("arith", |m| {
            m.function("mult", |(a, b): (i64, i64)| a * b)
                .target("add", TwoArgs);
            Ok(())
        })
        .register_module("broken", |_| {
            Err(ModuleInitError::new("unterminated string on line 3"))
        });
    registry
}

fn abbreviate_name(name: String) -> String {
    let parts: Vec<_> = name.split_whitespace().collect();
    let Some((last, rest)) = parts.split_last() else {
        return String::new();
    };
    let mut out = String::new();
    for part in rest {
        if let Some(initial) = part.chars().next() {
            out.push(initial);
            out.push_str(". ");
        }
    }
    out.push_str(last);
    out
}

/// Starts a long-running `sleep` that inherits stderr, writes its PID to `pid_file`, then does
/// `then`:
///
/// * `return`: returns `"returned"`.
/// * `spin`: never returns.
/// * `abort`: aborts.
/// * `detach-abort`: aborts, with the `sleep` moved out of the worker's process group first.
fn spawn_child((pid_file, then): (String, String)) -> String {
    let mut cmd = Command::new("sleep");
    cmd.arg("300").stdin(Stdio::null()).stdout(Stdio::null());
    #[cfg(unix)]
    if then == "detach-abort" {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let child = cmd.spawn().expect("sleep started");
    std::fs::write(&pid_file, child.id().to_string()).expect("PID file written");

    match then.as_str() {
        "return" => "returned".to_owned(),
        "spin" => loop {
            std::hint::spin_loop();
        },
        "abort" | "detach-abort" => std::process::abort(),
        other => panic!("unknown action {other}"),
    }
}

fn recurse(depth: u64) -> u64 {
    let frame = black_box([depth; 128]);
    if black_box(depth) == u64::MAX {
        return 0;
    }
    // Using the frame after the call keeps it alive across the recursion.
    recurse(depth + 1).wrapping_add(frame[0])
}

struct TwoArgs;

impl Target for TwoArgs {
    fn arity(&self) -> usize {
        2
    }

    fn call(&self, _input: Value) -> Result<Value, TargetCallError> {
        Err(TargetCallError::Custom("never called".to_owned()))
    }
}
