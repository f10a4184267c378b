// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Application identity read once from the bundle.

use std::path::{Path, PathBuf};

use log::error;

use crate::bundle::BundleInspector;
use crate::key::ConfigKey;
use crate::value::ConfigValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    bundle_path: PathBuf,
    name: String,
    version: String,
    valid_version: bool,
    display_version: String,
}

impl HostIdentity {
    pub fn from_bundle(bundle: &dyn BundleInspector) -> Self {
        let bundle_path = bundle.bundle_path().to_path_buf();

        let name = manifest_text(bundle, &ConfigKey::BundleDisplayName)
            .or_else(|| manifest_text(bundle, &ConfigKey::BundleName))
            .unwrap_or_else(|| {
                bundle_path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

        let version = manifest_text(bundle, &ConfigKey::BundleVersion).unwrap_or_else(|| {
            error!("{} has no {}; this attribute is required", name, ConfigKey::BundleVersion);
            String::new()
        });
        let valid_version = !version.is_empty();

        let display_version = manifest_text(bundle, &ConfigKey::BundleShortVersion)
            .unwrap_or_else(|| version.clone());

        Self { bundle_path, name, version, valid_version, display_version }
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn valid_version(&self) -> bool {
        self.valid_version
    }

    pub fn display_version(&self) -> &str {
        &self.display_version
    }
}

/// Trimmed, non-empty string entry. Numbers are accepted for version keys written
/// without quotes in the manifest (`1.5` parses as a float, `2.0` keeps its `.0`).
fn manifest_text(bundle: &dyn BundleInspector, key: &ConfigKey) -> Option<String> {
    let text = match bundle.manifest_value(key.as_str())? {
        ConfigValue::Integer(number) => number.to_string(),
        ConfigValue::Float(number) if number.is_finite() => format!("{number:?}"),
        ConfigValue::String(text) => text.trim().to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
