// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host options and the built-in defaults tier.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::bundle::ManifestError;
use crate::key::ConfigKey;
use crate::value::ConfigValue;

/// Default upper bound for a single environment probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// One day, in seconds.
const DEFAULT_CHECK_INTERVAL_SECS: i64 = 86_400;

/// Lowest-precedence configuration tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    entries: BTreeMap<String, ConfigValue>,
}

impl Defaults {
    /// An empty tier; every lookup falls through to absent.
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// The framework's shipped defaults.
    pub fn builtin() -> Self {
        let mut defaults = Self::empty();
        defaults.set(ConfigKey::ScheduledCheckInterval, DEFAULT_CHECK_INTERVAL_SECS);
        defaults.set(ConfigKey::EnableAutomaticChecks, false);
        defaults.set(ConfigKey::AutomaticallyUpdate, false);
        defaults.set(ConfigKey::AllowsAutomaticUpdates, true);
        defaults.set(ConfigKey::SendProfileInfo, false);
        defaults.set(ConfigKey::RequireSignedUpdates, false);
        defaults
    }

    pub fn set(&mut self, key: impl Into<ConfigKey>, value: impl Into<ConfigValue>) {
        self.entries.insert(key.into().as_str().to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Options controlling a [`crate::Host`].
#[derive(Debug, Clone, PartialEq)]
pub struct HostOptions {
    pub probe_timeout: Duration,
    pub defaults: Defaults,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self { probe_timeout: DEFAULT_PROBE_TIMEOUT, defaults: Defaults::builtin() }
    }
}

#[derive(Debug, Deserialize)]
struct RawOptions {
    probe_timeout_ms: Option<u64>,
    #[serde(default)]
    defaults: BTreeMap<String, toml::Value>,
}

impl HostOptions {
    /// Parses options from TOML.
    ///
    /// ```toml
    /// probe_timeout_ms = 500
    ///
    /// [defaults]
    /// SUScheduledCheckInterval = 3600
    /// ```
    ///
    /// Entries under `[defaults]` are layered over the built-in defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        let raw: RawOptions = toml::from_str(input)?;
        let mut options = HostOptions::default();
        if let Some(ms) = raw.probe_timeout_ms {
            options.probe_timeout = Duration::from_millis(ms);
        }
        for (key, value) in raw.defaults {
            if let Some(value) = ConfigValue::from_toml(&key, value) {
                options.defaults.set(key, value);
            }
        }
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let data = fs::read_to_string(path)
            .map_err(|source| ManifestError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&data)
            .map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })
    }
}
