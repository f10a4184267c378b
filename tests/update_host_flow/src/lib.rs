// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host integration fixtures for the update-host library
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: fixtures only (tests live in tests/host_flow.rs)

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::SigningKey;

use update_host::{EnvironmentProbe, Host, HostOptions, ProbeError, StaticBundle};

pub const BUNDLE_PATH: &str = "/Applications/Demo.app";

/// PEM-framed DSA public key with a well-formed base64 body.
pub const DSA_PEM: &str =
    "-----BEGIN PUBLIC KEY-----\nMIIBtjCCASsGByqGSM44BAEwggEeAoGBAMNR\n-----END PUBLIC KEY-----";

/// Deterministic signing key used by every fixture.
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub fn public_key_b64(signing: &SigningKey) -> String {
    BASE64.encode(signing.verifying_key().to_bytes())
}

/// Mount state the tests can flip between queries.
#[derive(Debug, Default)]
pub struct MountState {
    pub read_only: AtomicBool,
    pub translocated: AtomicBool,
    pub hang: AtomicBool,
    pub read_only_calls: AtomicUsize,
}

impl MountState {
    pub fn set_read_only(&self, value: bool) {
        self.read_only.store(value, Ordering::SeqCst);
    }

    pub fn set_translocated(&self, value: bool) {
        self.translocated.store(value, Ordering::SeqCst);
    }

    pub fn set_hang(&self, value: bool) {
        self.hang.store(value, Ordering::SeqCst);
    }

    /// Number of times the read-only probe has actually run.
    pub fn read_only_probes(&self) -> usize {
        self.read_only_calls.load(Ordering::SeqCst)
    }
}

/// Probe answering from a shared [`MountState`].
#[derive(Debug, Clone)]
pub struct FakeProbe(pub Arc<MountState>);

impl FakeProbe {
    fn wait_if_hung(&self) {
        if self.0.hang.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_secs(2));
        }
    }
}

impl EnvironmentProbe for FakeProbe {
    fn read_only_volume(&self, _path: &Path) -> Result<bool, ProbeError> {
        self.0.read_only_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_hung();
        Ok(self.0.read_only.load(Ordering::SeqCst))
    }

    fn translocated(&self, _path: &Path) -> Result<bool, ProbeError> {
        self.wait_if_hung();
        Ok(self.0.translocated.load(Ordering::SeqCst))
    }
}

/// Builds a host over `bundle` with a fake probe and a short probe timeout.
pub fn host_with(bundle: StaticBundle) -> (Host, Arc<MountState>) {
    let state = Arc::new(MountState::default());
    let options = HostOptions { probe_timeout: Duration::from_millis(100), ..HostOptions::default() };
    let host = Host::builder(Arc::new(bundle))
        .probe(Arc::new(FakeProbe(Arc::clone(&state))))
        .options(options)
        .build();
    (host, state)
}

pub fn demo_bundle() -> StaticBundle {
    StaticBundle::new(BUNDLE_PATH)
        .with_value("CFBundleName", "Demo")
        .with_value("CFBundleVersion", "100")
        .with_value("CFBundleShortVersionString", "1.0.0")
}
