// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The table of test cases to run.

use crate::{
    errors::TestTableError,
    value::{CaseInput, CaseValue},
};
use indexmap::{IndexMap, map::Entry};
use serde::Deserialize;

/// A single test case: an input and the output the target is expected to produce for it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    /// The input passed to the target.
    pub input: CaseInput,

    /// The expected output.
    pub expected: CaseValue,
}

impl TestCase {
    /// Creates a new test case.
    pub fn new(input: impl Into<CaseInput>, expected: impl Into<CaseValue>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

/// A set of test cases keyed by input.
///
/// Each input appears at most once. Iteration follows insertion order, but the outcome of a run
/// does not depend on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestTable {
    cases: IndexMap<CaseInput, CaseValue>,
}

impl TestTable {
    /// Creates an empty test table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a test table out of a list of cases.
    ///
    /// Returns an error if any input is listed more than once.
    pub fn from_cases(cases: impl IntoIterator<Item = TestCase>) -> Result<Self, TestTableError> {
        let mut table = Self::new();
        for case in cases {
            table.insert(case)?;
        }
        Ok(table)
    }

    /// Adds a case to the table.
    ///
    /// Returns an error if a case with the same input already exists. The existing case is left
    /// untouched.
    pub fn insert(&mut self, case: TestCase) -> Result<(), TestTableError> {
        match self.cases.entry(case.input) {
            Entry::Vacant(entry) => {
                entry.insert(case.expected);
                Ok(())
            }
            Entry::Occupied(entry) => Err(TestTableError::DuplicateInput {
                input: entry.key().clone(),
            }),
        }
    }

    /// Returns the number of cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if there are no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Returns the expected output for an input, if the input is in the table.
    pub fn expected(&self, input: &CaseInput) -> Option<&CaseValue> {
        self.cases.get(input)
    }

    /// Iterates over the cases as (input, expected) pairs.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&CaseInput, &CaseValue)> + '_ {
        self.cases.iter()
    }
}
