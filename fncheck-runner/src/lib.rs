// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for fncheck: running a table of test cases against a single-argument
//! function, each case in its own process and bounded by a deadline.
//!
//! The basic flow is:
//!
//! 1. Register targets in a [`TargetRegistry`](target::TargetRegistry).
//! 2. Build a [`TestTable`](test_table::TestTable) of inputs and expected outputs.
//! 3. Build a [`TestRunner`](runner::TestRunner) and call
//!    [`run`](runner::TestRunner::run). The target is resolved first; a
//!    [`LoadError`](errors::LoadError) stops the run before any case executes.
//! 4. Each case runs in a worker process (see [`worker`]) and is classified as a success, a
//!    mismatch, a crash or a timeout (see [`outcome`]).
//! 5. Render the [`Report`](reporter::Report).
//!
//! Programs using fncheck act as their own worker: `main` must hand control to
//! [`worker::run_worker`] when [`WorkerCommand::is_worker_invocation`](worker::WorkerCommand::is_worker_invocation)
//! says so.

pub mod config;
pub mod errors;
pub mod executor;
pub mod outcome;
pub mod reporter;
pub mod runner;
pub mod target;
pub mod test_table;
mod time;
pub mod value;
pub mod worker;
