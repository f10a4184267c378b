// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host facade consumed by the update pipeline
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 6 unit tests (+ tests/update_host_flow integration)
//!
//! One `Host` per application instance. Nothing here is process-global: the bundle,
//! preference store and environment probe are injected at construction.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::bundle::BundleInspector;
use crate::config::HostOptions;
use crate::environment::{CapabilityDetector, CapabilitySnapshot, EnvironmentProbe, SystemProbe};
use crate::identity::HostIdentity;
use crate::key::ConfigKey;
use crate::keys::KeyMaterial;
use crate::notify::SubscriptionId;
use crate::policy::{self, CandidateUpdate, Eligibility, InstallMode};
use crate::resolver::Resolver;
use crate::store::{MemoryPreferenceStore, PreferenceStore};
use crate::value::ConfigValue;
use crate::verify::SignatureVerifier;

pub struct Host {
    identity: HostIdentity,
    resolver: Resolver,
    keys: OnceLock<KeyMaterial>,
    detector: CapabilityDetector,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("identity", &self.identity)
            .field("keys", &self.keys.get())
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Host`]. Unset parts default to an in-memory preference store, the
/// platform probe and [`HostOptions::default`].
pub struct HostBuilder {
    bundle: Arc<dyn BundleInspector>,
    store: Option<Arc<dyn PreferenceStore>>,
    probe: Option<Arc<dyn EnvironmentProbe>>,
    options: HostOptions,
}

impl HostBuilder {
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Host {
        let identity = HostIdentity::from_bundle(self.bundle.as_ref());
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryPreferenceStore::new()));
        let probe = self.probe.unwrap_or_else(|| Arc::new(SystemProbe));
        let detector =
            CapabilityDetector::new(probe, identity.bundle_path(), self.options.probe_timeout);
        debug!(
            "host {} {} at {}",
            identity.name(),
            identity.display_version(),
            identity.bundle_path().display()
        );
        Host {
            identity,
            resolver: Resolver::new(self.bundle, store, self.options.defaults),
            keys: OnceLock::new(),
            detector,
        }
    }
}

impl Host {
    pub fn builder(bundle: Arc<dyn BundleInspector>) -> HostBuilder {
        HostBuilder { bundle, store: None, probe: None, options: HostOptions::default() }
    }

    /// Host with an in-memory preference store and the platform probe.
    pub fn new(bundle: Arc<dyn BundleInspector>) -> Self {
        Self::builder(bundle).build()
    }

    // Identity

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub fn bundle_path(&self) -> &Path {
        self.identity.bundle_path()
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn version(&self) -> &str {
        self.identity.version()
    }

    pub fn valid_version(&self) -> bool {
        self.identity.valid_version()
    }

    pub fn display_version(&self) -> &str {
        self.identity.display_version()
    }

    // Configuration

    pub fn lookup(&self, key: impl Into<ConfigKey>) -> Option<ConfigValue> {
        self.resolver.lookup(key)
    }

    pub fn lookup_bool(&self, key: impl Into<ConfigKey>) -> bool {
        self.resolver.lookup_bool(key)
    }

    pub fn manifest_value(&self, key: impl Into<ConfigKey>) -> Option<ConfigValue> {
        self.resolver.manifest_value(key)
    }

    pub fn manifest_bool(&self, key: impl Into<ConfigKey>) -> bool {
        self.resolver.manifest_bool(key)
    }

    pub fn override_value(&self, key: impl Into<ConfigKey>) -> Option<ConfigValue> {
        self.resolver.override_value(key)
    }

    pub fn override_bool(&self, key: impl Into<ConfigKey>) -> bool {
        self.resolver.override_bool(key)
    }

    pub fn set_override(&self, key: impl Into<ConfigKey>, value: Option<ConfigValue>) {
        self.resolver.set_override(key, value);
    }

    pub fn set_override_bool(&self, key: impl Into<ConfigKey>, value: bool) {
        self.resolver.set_override_bool(key, value);
    }

    pub fn observe<I, K, F>(&self, keys: I, handler: F) -> SubscriptionId
    where
        I: IntoIterator<Item = K>,
        K: Into<ConfigKey>,
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.resolver.observe(keys, handler)
    }

    pub fn unobserve(&self, id: SubscriptionId) -> bool {
        self.resolver.unobserve(id)
    }

    // Trust

    /// Key material from the bundled manifest, derived on first call.
    pub fn public_keys(&self) -> &KeyMaterial {
        self.keys
            .get_or_init(|| KeyMaterial::load(self.resolver.bundle(), self.resolver.store()))
    }

    pub fn legacy_key_configuration_key_name(&self) -> Option<&str> {
        self.public_keys().legacy_key_configuration_key_name()
    }

    pub fn legacy_key_file(&self) -> Option<&str> {
        self.public_keys().legacy_key_file()
    }

    /// `true` when unsigned updates must be rejected unconditionally.
    pub fn has_update_security_policy(&self) -> bool {
        policy::has_security_policy(self.public_keys(), self.requires_signed_updates())
    }

    /// `SURequireSignedUpdates` as the trust decision sees it. A runtime override can
    /// turn the requirement on but never off when the bundle declares it.
    fn requires_signed_updates(&self) -> bool {
        let key = ConfigKey::RequireSignedUpdates;
        if !self.manifest_bool(&key) {
            return self.lookup_bool(key);
        }
        if self.override_value(&key).is_some_and(|value| !value.as_bool()) {
            warn!("ignoring runtime override of {key}; the bundle requires signed updates");
        }
        true
    }

    // Environment

    pub fn is_on_read_only_volume(&self) -> bool {
        self.detector.is_on_read_only_volume()
    }

    pub fn is_translocated(&self) -> bool {
        self.detector.is_translocated()
    }

    pub fn capabilities(&self) -> CapabilitySnapshot {
        self.detector.snapshot()
    }

    /// Full eligibility decision for one candidate update.
    pub fn evaluate(
        &self,
        candidate: &CandidateUpdate<'_>,
        verifier: &dyn SignatureVerifier,
    ) -> Eligibility {
        let verification = policy::verify_candidate(
            self.public_keys(),
            self.requires_signed_updates(),
            candidate,
            verifier,
        );
        let install = InstallMode::from_snapshot(self.capabilities());
        let eligibility = Eligibility { verification, install };
        if !eligibility.may_apply_in_place() {
            debug!("update not applicable in place: {}", eligibility.reasons().join("; "));
        }
        eligibility
    }
}
