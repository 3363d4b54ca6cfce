// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run a table of test cases against a single-argument function.
//!
//! Each case runs in its own process and is bounded by a deadline. A crash, a hang or a wrong
//! answer in one case is reported and never affects the others.
//!
//! The binary ships with a few sample targets (see `fncheck list`); the library behind it is
//! [`fncheck_runner`].

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod samples;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
