// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Trust anchors declared by the host bundle
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 9 unit tests
//!   - modern (EdDSA) key extraction, valid and malformed
//!   - legacy (DSA) key inline and from a bundled resource
//!   - keys never taken from the override store
//!
//! Key material comes from the bundled manifest only. Absence is a valid trust
//! state and nothing here fails: entries that cannot be read are logged and
//! treated as absent for their scheme.
//!
//! DEPENDENCIES:
//!   - ed25519-dalek: modern key validation
//!   - base64: key decoding
//!   - sha2 + hex: key fingerprints for diagnostics

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::VerifyingKey;
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::bundle::BundleInspector;
use crate::key::ConfigKey;
use crate::store::PreferenceStore;

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";

/// Signature scheme a public key is trusted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scheme {
    /// DSA, kept for hosts that have not migrated.
    Legacy,
    /// EdDSA (Ed25519).
    Modern,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Legacy => f.write_str("dsa"),
            Scheme::Modern => f.write_str("ed25519"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Decodes for its scheme and can be handed to a verifier.
    Valid,
    /// Declared, but does not decode. Still a trust declaration; never verifies.
    Malformed,
}

/// Where the legacy key was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyKeySource {
    /// PEM text inline in `SUPublicDSAKey`.
    Inline,
    /// Bundled resource named by `SUPublicDSAKeyFile`.
    File(String),
}

impl LegacyKeySource {
    pub fn configuration_key(&self) -> ConfigKey {
        match self {
            LegacyKeySource::Inline => ConfigKey::PublicDsaKey,
            LegacyKeySource::File(_) => ConfigKey::PublicDsaKeyFile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    scheme: Scheme,
    encoded: String,
    decoded: Option<Vec<u8>>,
}

impl PublicKey {
    fn modern(encoded: String) -> Self {
        let decoded = BASE64
            .decode(encoded.as_bytes())
            .ok()
            .filter(|bytes| bytes.len() == 32)
            .filter(|bytes| {
                <[u8; 32]>::try_from(bytes.as_slice())
                    .ok()
                    .is_some_and(|array| VerifyingKey::from_bytes(&array).is_ok())
            });
        Self { scheme: Scheme::Modern, encoded, decoded }
    }

    fn legacy(encoded: String) -> Self {
        let decoded = decode_pem_body(&encoded);
        Self { scheme: Scheme::Legacy, encoded, decoded }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The key exactly as declared by the bundle (trimmed).
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn status(&self) -> KeyStatus {
        if self.decoded.is_some() {
            KeyStatus::Valid
        } else {
            KeyStatus::Malformed
        }
    }

    pub fn is_valid(&self) -> bool {
        self.decoded.is_some()
    }

    /// Raw key bytes: the 32-byte Ed25519 point, or the DER body of a DSA key.
    pub fn decoded(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    pub fn ed25519_bytes(&self) -> Option<[u8; 32]> {
        if self.scheme != Scheme::Modern {
            return None;
        }
        self.decoded.as_deref().and_then(|bytes| bytes.try_into().ok())
    }

    /// Short stable identifier for logs.
    pub fn fingerprint(&self) -> String {
        let digest = match &self.decoded {
            Some(bytes) => Sha256::digest(bytes),
            None => Sha256::digest(self.encoded.as_bytes()),
        };
        hex::encode(&digest[..8])
    }
}

/// Immutable set of trust anchors, at most one per scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    modern: Option<PublicKey>,
    legacy: Option<PublicKey>,
    legacy_source: Option<LegacyKeySource>,
}

impl KeyMaterial {
    /// Reads the key fields of the bundled manifest.
    ///
    /// `overrides` is consulted only to report key fields that were set at runtime;
    /// such entries are ignored.
    pub fn load(bundle: &dyn BundleInspector, overrides: &dyn PreferenceStore) -> Self {
        for key in [ConfigKey::PublicEdKey, ConfigKey::PublicDsaKey, ConfigKey::PublicDsaKeyFile] {
            if overrides.get(key.as_str()).is_some() {
                warn!("ignoring runtime override of {key}; trust anchors come from the bundle only");
            }
        }

        let modern = manifest_string(bundle, &ConfigKey::PublicEdKey).map(PublicKey::modern);
        if let Some(key) = &modern {
            if key.is_valid() {
                debug!("modern public key {}", key.fingerprint());
            } else {
                warn!("{} is not a base64 Ed25519 public key", ConfigKey::PublicEdKey);
            }
        }

        let (legacy_source, legacy_text) = legacy_declaration(bundle);
        let legacy = legacy_text.and_then(|text| {
            if !text.contains(PEM_BEGIN) {
                warn!("legacy public key is not PEM framed, ignoring it");
                return None;
            }
            let key = PublicKey::legacy(text);
            if key.is_valid() {
                debug!("legacy public key {}", key.fingerprint());
            } else {
                warn!("legacy public key has a malformed PEM body");
            }
            Some(key)
        });

        Self { modern, legacy, legacy_source }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_modern(mut self, encoded: impl Into<String>) -> Self {
        self.modern = Some(PublicKey::modern(encoded.into()));
        self
    }

    pub fn with_legacy(mut self, pem: impl Into<String>, source: LegacyKeySource) -> Self {
        self.legacy = Some(PublicKey::legacy(pem.into()));
        self.legacy_source = Some(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.modern.is_none() && self.legacy.is_none()
    }

    pub fn len(&self) -> usize {
        usize::from(self.modern.is_some()) + usize::from(self.legacy.is_some())
    }

    pub fn get(&self, scheme: Scheme) -> Option<&PublicKey> {
        match scheme {
            Scheme::Modern => self.modern.as_ref(),
            Scheme::Legacy => self.legacy.as_ref(),
        }
    }

    pub fn contains(&self, scheme: Scheme) -> bool {
        self.get(scheme).is_some()
    }

    /// Declared keys, modern first.
    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.modern.iter().chain(self.legacy.iter())
    }

    /// Configuration key that supplied the legacy key in this set. `None` when no legacy
    /// key was kept, even if one was declared and rejected.
    pub fn legacy_key_configuration_key_name(&self) -> Option<&str> {
        self.legacy.as_ref()?;
        self.legacy_source.as_ref().and_then(|source| source.configuration_key().known_name())
    }

    /// Resource name given by `SUPublicDSAKeyFile`, as declared. Reported even when the
    /// resource is missing or unusable.
    pub fn legacy_key_file(&self) -> Option<&str> {
        match &self.legacy_source {
            Some(LegacyKeySource::File(name)) => Some(name),
            _ => None,
        }
    }

    pub fn legacy_source(&self) -> Option<&LegacyKeySource> {
        self.legacy_source.as_ref()
    }
}

fn manifest_string(bundle: &dyn BundleInspector, key: &ConfigKey) -> Option<String> {
    let value = bundle.manifest_value(key.as_str())?;
    match value.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        Some(_) => {
            warn!("{key} is blank, ignoring it");
            None
        }
        None => {
            warn!("{key} must be a string, found {}", value.kind());
            None
        }
    }
}

/// Inline `SUPublicDSAKey` wins over `SUPublicDSAKeyFile`.
fn legacy_declaration(bundle: &dyn BundleInspector) -> (Option<LegacyKeySource>, Option<String>) {
    if let Some(text) = manifest_string(bundle, &ConfigKey::PublicDsaKey) {
        return (Some(LegacyKeySource::Inline), Some(text));
    }
    let Some(name) = manifest_string(bundle, &ConfigKey::PublicDsaKeyFile) else {
        return (None, None);
    };
    let text = match bundle.resource(&name).map(String::from_utf8) {
        Some(Ok(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Some(Ok(_)) => {
            warn!("legacy key file {name} is empty");
            None
        }
        Some(Err(_)) => {
            warn!("legacy key file {name} is not utf-8");
            None
        }
        None => {
            warn!("legacy key file {name} not found in bundle resources");
            None
        }
    };
    (Some(LegacyKeySource::File(name)), text)
}

fn decode_pem_body(input: &str) -> Option<Vec<u8>> {
    let start = input.find(PEM_BEGIN)? + PEM_BEGIN.len();
    let stop = input.find(PEM_END)?;
    if stop <= start {
        return None;
    }
    let cleaned: String = input[start..stop].chars().filter(|ch| !ch.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    BASE64.decode(cleaned.as_bytes()).ok()
}
