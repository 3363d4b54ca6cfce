// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Values passed to and returned from targets.
//!
//! Targets see plain JSON values. The harness wraps them in two types:
//!
//! * [`CaseInput`], used as the key of a test table. Its identity is the canonical compact JSON
//!   text of the value, so it can be hashed and compared reliably.
//! * [`CaseValue`], used for expected and actual outputs. These are compared with JSON value
//!   equality.
//!
//! Both display JSON strings as the raw string and everything else as compact JSON, which is how
//! values appear in reports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{fmt, hash::Hash};

/// The input of a single test case.
#[derive(Clone, Debug)]
pub struct CaseInput {
    value: Value,
    canonical: String,
}

impl CaseInput {
    /// Creates a new input from a JSON value.
    pub fn new(value: Value) -> Self {
        let canonical = value.to_string();
        Self { value, canonical }
    }

    /// Returns the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the canonical JSON text of this input. This is what is sent to the worker.
    pub fn as_json(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for CaseInput {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CaseInput {}

impl Hash for CaseInput {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl From<Value> for CaseInput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CaseInput {
    fn from(s: &str) -> Self {
        Self::new(Value::String(s.to_owned()))
    }
}

impl fmt::Display for CaseInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_value(&self.value, f)
    }
}

impl Serialize for CaseInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CaseInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

/// An expected or actual output value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseValue(Value);

impl CaseValue {
    /// Creates a new value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for CaseValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for CaseValue {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_owned()))
    }
}

impl fmt::Display for CaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_value(&self.0, f)
    }
}

fn display_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::String(s) => f.write_str(s),
        other => write!(f, "{other}"),
    }
}
