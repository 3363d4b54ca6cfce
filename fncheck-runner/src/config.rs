// Copyright (c) The fncheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for fncheck.
//!
//! Configuration is read from a TOML file, `fncheck.toml` in the current directory by default,
//! layered on top of the defaults in `default-config.toml`. Keys that fncheck doesn't recognize are
//! collected and returned to the caller so it can warn about them.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    outcome::TimeoutLimit,
    target::TargetSpec,
    test_table::{TestCase, TestTable},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, de::IntoDeserializer};
use std::{collections::BTreeSet, fmt, time::Duration};

/// Overall configuration for fncheck.
#[derive(Clone, Debug)]
pub struct FncheckConfig {
    config_file: Utf8PathBuf,
    target: Option<TargetSpec>,
    timeout: TimeoutLimit,
    suppress_target_output: bool,
    table: TestTable,
    unknown_keys: BTreeSet<String>,
}

impl FncheckConfig {
    /// The default location of the config file, relative to the current directory.
    pub const CONFIG_PATH: &'static str = "fncheck.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the configuration.
    ///
    /// If `config_file` is given, it must exist. Otherwise `fncheck.toml` in `cwd` is read if it
    /// exists, and the defaults are used if it does not.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        cwd: &Utf8Path,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = cwd.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        Self::from_builder(config_file, &builder)
    }

    /// Reads the configuration out of a TOML string. `config_file` is only used for error
    /// reporting.
    pub fn from_toml_str(
        config_file: impl Into<Utf8PathBuf>,
        contents: &str,
    ) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(contents, FileFormat::Toml));
        Self::from_builder(config_file.into(), &builder)
    }

    /// Returns the config file these settings were read from. The file may not exist, in which
    /// case the defaults were used.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the target, if one was configured.
    pub fn target(&self) -> Option<&TargetSpec> {
        self.target.as_ref()
    }

    /// Returns the deadline applied to every case.
    pub fn timeout(&self) -> TimeoutLimit {
        self.timeout
    }

    /// Returns true if output written by the target to standard output should be discarded.
    pub fn suppress_target_output(&self) -> bool {
        self.suppress_target_output
    }

    /// Returns the test cases.
    pub fn table(&self) -> &TestTable {
        &self.table
    }

    /// Returns a mutable reference to the test cases, so that more can be added.
    pub fn table_mut(&mut self) -> &mut TestTable {
        &mut self.table
    }

    /// Returns the keys in the config file that were not recognized, in sorted order.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn from_builder(
        config_file: Utf8PathBuf,
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigParseError> {
        let (config, unknown_keys) = Self::build_and_deserialize_config(builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        let timeout = config
            .run
            .timeout
            .into_limit()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        let table = TestTable::from_cases(config.cases)
            .map_err(|error| ConfigParseError::new(&config_file, error.into()))?;

        Ok(Self {
            config_file,
            target: config
                .target
                .map(|target| TargetSpec::new(target.module, target.function)),
            timeout,
            suppress_target_output: config.run.suppress_target_output,
            table,
            unknown_keys,
        })
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(FncheckConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: FncheckConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already tracks the key, so drop it from the config error.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FncheckConfigDeserialize {
    #[serde(default)]
    target: Option<TargetDeserialize>,
    run: RunDeserialize,
    cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TargetDeserialize {
    module: String,
    function: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunDeserialize {
    #[serde(deserialize_with = "deserialize_timeout")]
    timeout: RawTimeout,
    suppress_target_output: bool,
}

/// A timeout as written in the config file, before validation.
#[derive(Clone, Debug, PartialEq)]
enum RawTimeout {
    Secs(f64),
    Human { input: String, duration: Duration },
}

impl RawTimeout {
    fn into_limit(self) -> Result<TimeoutLimit, ConfigParseErrorKind> {
        let (limit, input) = match self {
            Self::Secs(secs) => (TimeoutLimit::from_secs_f64(secs), secs.to_string()),
            Self::Human { input, duration } => (TimeoutLimit::new(duration), input),
        };
        limit.ok_or(ConfigParseErrorKind::InvalidTimeout { input })
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<RawTimeout, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;

    impl serde::de::Visitor<'_> for V {
        type Value = RawTimeout;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(
                formatter,
                "a number of seconds (2, 0.5) or a duration string (\"1500ms\")"
            )
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(RawTimeout::Secs(v as f64))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(RawTimeout::Secs(v as f64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(RawTimeout::Secs(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let duration = humantime_serde::deserialize(v.into_deserializer())?;
            Ok(RawTimeout::Human {
                input: v.to_owned(),
                duration,
            })
        }
    }

    deserializer.deserialize_any(V)
}
