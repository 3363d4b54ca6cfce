// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `fncheck` failures.
///
/// `fncheck run` may fail for a variety of reasons. This structure documents the exit codes that
/// may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum FncheckExitCode {}

impl FncheckExitCode {
    /// Every case passed, or the target loaded and no cases were supplied.
    pub const OK: i32 = 0;

    /// One or more cases crashed, timed out or produced the wrong output.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The target could not be loaded, so no cases were run.
    pub const LOAD_FAILED: i32 = 104;

    /// Writing the report to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// The worker subcommand was invoked without a valid request.
    pub const WORKER_REQUEST_INVALID: i32 = 70;

    /// A user issue happened while setting up an fncheck invocation.
    pub const SETUP_ERROR: i32 = 96;
}
