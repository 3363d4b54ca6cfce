// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Stable constants shared by `fncheck` and tools built on top of it.

mod exit_codes;

pub use exit_codes::*;
