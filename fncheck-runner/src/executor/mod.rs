// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running a single case in an isolated worker process.
//!
//! The main structure in this module is [`IsolatedExecutor`].

mod imp;

#[cfg(unix)]
#[path = "unix.rs"]
mod os;

#[cfg(windows)]
#[path = "windows.rs"]
mod os;

pub use imp::*;
