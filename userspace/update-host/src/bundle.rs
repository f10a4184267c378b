// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Bundle inspection seam (bundled manifest + resources)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 4 unit tests
//!   - TOML manifest parsing, unsupported values skipped
//!   - directory bundle loading from disk
//!   - resource lookup rejects path traversal
//!
//! PUBLIC API:
//!   - BundleInspector: read-only view of an application bundle
//!   - Manifest: bundled key/value entries
//!   - StaticBundle: in-memory bundle
//!   - DirectoryBundle: `<bundle>/Info.toml` + `<bundle>/Resources/`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::value::ConfigValue;

/// File name of the bundled manifest inside a [`DirectoryBundle`].
pub const MANIFEST_FILE: &str = "Info.toml";
/// Directory holding bundled resources inside a [`DirectoryBundle`].
pub const RESOURCES_DIR: &str = "Resources";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Read-only view of the application bundle the host was built from.
pub trait BundleInspector: Send + Sync {
    /// Canonical path of the bundle on disk.
    fn bundle_path(&self) -> &Path;

    /// Raw entry of the bundled manifest.
    fn manifest_value(&self, key: &str) -> Option<ConfigValue>;

    /// Contents of a bundled resource, `None` when missing or unreadable.
    fn resource(&self, name: &str) -> Option<Vec<u8>>;
}

/// Bundled manifest entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: BTreeMap<String, ConfigValue>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML manifest. Values that have no [`ConfigValue`] form are skipped.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        let raw: BTreeMap<String, toml::Value> = toml::from_str(input)?;
        let mut manifest = Manifest::new();
        for (key, value) in raw {
            if let Some(value) = ConfigValue::from_toml(&key, value) {
                manifest.entries.insert(key, value);
            }
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let data = fs::read_to_string(path)
            .map_err(|source| ManifestError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&data)
            .map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.entries.insert(key.into(), value.into());
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

/// Bundle held entirely in memory.
#[derive(Debug, Clone)]
pub struct StaticBundle {
    path: PathBuf,
    manifest: Manifest,
    resources: BTreeMap<String, Vec<u8>>,
}

impl StaticBundle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), manifest: Manifest::new(), resources: BTreeMap::new() }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.manifest.insert(key, value);
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(name.into(), contents.into());
        self
    }
}

impl BundleInspector for StaticBundle {
    fn bundle_path(&self) -> &Path {
        &self.path
    }

    fn manifest_value(&self, key: &str) -> Option<ConfigValue> {
        self.manifest.get(key).cloned()
    }

    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        self.resources.get(name).cloned()
    }
}

/// Bundle laid out on disk as `<path>/Info.toml` plus `<path>/Resources/`.
///
/// The manifest is read once at [`DirectoryBundle::open`]; resources are read on demand.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    path: PathBuf,
    manifest: Manifest,
}

impl DirectoryBundle {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        let path = fs::canonicalize(&path).unwrap_or(path);
        let manifest = Manifest::load(&path.join(MANIFEST_FILE))?;
        debug!("loaded bundle manifest from {} ({} entries)", path.display(), manifest.len());
        Ok(Self { path, manifest })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

impl BundleInspector for DirectoryBundle {
    fn bundle_path(&self) -> &Path {
        &self.path
    }

    fn manifest_value(&self, key: &str) -> Option<ConfigValue> {
        self.manifest.get(key).cloned()
    }

    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        if !is_safe_resource_name(name) {
            warn!("refusing resource outside the bundle: {name}");
            return None;
        }
        let path = self.path.join(RESOURCES_DIR).join(name);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!("resource {} unavailable: {err}", path.display());
                None
            }
        }
    }
}

fn is_safe_resource_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('/') || name.contains('\0') || name.contains('\\') {
        return false;
    }
    name.split('/').all(|part| part != "..")
}
