// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed configuration keys.
//!
//! Every tier (override store, bundled manifest, built-in defaults) is keyed by the
//! wire name returned from [`ConfigKey::as_str`], so `ConfigKey::from("SUFeedURL")`
//! and `ConfigKey::FeedUrl` always address the same entry.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    /// `CFBundleName`
    BundleName,
    /// `CFBundleDisplayName`
    BundleDisplayName,
    /// `CFBundleVersion`
    BundleVersion,
    /// `CFBundleShortVersionString`
    BundleShortVersion,
    /// `SUFeedURL`
    FeedUrl,
    /// `SUEnableAutomaticChecks`
    EnableAutomaticChecks,
    /// `SUScheduledCheckInterval`
    ScheduledCheckInterval,
    /// `SUAutomaticallyUpdate`
    AutomaticallyUpdate,
    /// `SUAllowsAutomaticUpdates`
    AllowsAutomaticUpdates,
    /// `SUSendProfileInfo`
    SendProfileInfo,
    /// `SURequireSignedUpdates`
    RequireSignedUpdates,
    /// `SUPublicEDKey`
    PublicEdKey,
    /// `SUPublicDSAKey`
    PublicDsaKey,
    /// `SUPublicDSAKeyFile`
    PublicDsaKeyFile,
    /// Any key without a dedicated variant.
    Other(String),
}

const KNOWN: &[(ConfigKey, &str)] = &[
    (ConfigKey::BundleName, "CFBundleName"),
    (ConfigKey::BundleDisplayName, "CFBundleDisplayName"),
    (ConfigKey::BundleVersion, "CFBundleVersion"),
    (ConfigKey::BundleShortVersion, "CFBundleShortVersionString"),
    (ConfigKey::FeedUrl, "SUFeedURL"),
    (ConfigKey::EnableAutomaticChecks, "SUEnableAutomaticChecks"),
    (ConfigKey::ScheduledCheckInterval, "SUScheduledCheckInterval"),
    (ConfigKey::AutomaticallyUpdate, "SUAutomaticallyUpdate"),
    (ConfigKey::AllowsAutomaticUpdates, "SUAllowsAutomaticUpdates"),
    (ConfigKey::SendProfileInfo, "SUSendProfileInfo"),
    (ConfigKey::RequireSignedUpdates, "SURequireSignedUpdates"),
    (ConfigKey::PublicEdKey, "SUPublicEDKey"),
    (ConfigKey::PublicDsaKey, "SUPublicDSAKey"),
    (ConfigKey::PublicDsaKeyFile, "SUPublicDSAKeyFile"),
];

impl ConfigKey {
    /// Maps a wire name onto its typed key; unknown names become [`ConfigKey::Other`].
    pub fn from_name(name: &str) -> Self {
        KNOWN
            .iter()
            .find(|(_, known)| *known == name)
            .map(|(key, _)| key.clone())
            .unwrap_or_else(|| ConfigKey::Other(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConfigKey::Other(name) => name.as_str(),
            known => known.known_name().unwrap_or_default(),
        }
    }

    /// Wire name of a dedicated variant; `None` for [`ConfigKey::Other`].
    pub fn known_name(&self) -> Option<&'static str> {
        KNOWN.iter().find(|(key, _)| key == self).map(|(_, name)| *name)
    }

    /// Keys carrying trust anchors. These are only ever read from the bundled manifest.
    pub fn is_key_material(&self) -> bool {
        matches!(self, ConfigKey::PublicEdKey | ConfigKey::PublicDsaKey | ConfigKey::PublicDsaKeyFile)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ConfigKey {
    fn from(name: &str) -> Self {
        ConfigKey::from_name(name)
    }
}

impl From<String> for ConfigKey {
    fn from(name: String) -> Self {
        ConfigKey::from_name(&name)
    }
}

impl From<&ConfigKey> for ConfigKey {
    fn from(key: &ConfigKey) -> Self {
        key.clone()
    }
}
