// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Integration tests for host trust resolution and update eligibility
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 15 tests
//!
//! TEST_SCOPE:
//!   - Security policy gate (keys, explicit flag, none)
//!   - Configuration precedence and change notification
//!   - Fail-closed environment probes
//!   - Eligibility decisions with real Ed25519 signatures
//!   - On-disk bundles
//!
//! TEST_SCENARIOS:
//!   - test_no_keys_no_policy(): empty manifest has no policy and no keys
//!   - test_modern_key_declared(): single modern key yields policy
//!   - test_legacy_key_only_declares_policy(): DSA-only host is still gated
//!   - test_bundled_require_flag_survives_override(): override cannot lower the gate
//!   - test_override_beats_manifest_bool(): override store wins
//!   - test_observer_invoked_once(): one write, one delivery
//!   - test_probe_timeout_fails_closed(): hung probe reports read-only
//!   - test_signed_update_applies_in_place(): happy path
//!   - test_unsigned_update_rejected_under_policy(): unsigned rejected
//!   - test_tampered_payload_rejected(): bad signature rejected
//!   - test_translocated_host_manual_only(): verified but blocked
//!   - test_unsigned_update_without_policy(): legacy permissive hosts
//!   - test_directory_bundle_with_key_file(): Info.toml + Resources
//!   - test_concurrent_readers_and_ordered_writes(): writer order preserved
//!   - test_hung_probe_not_respawned(): one outstanding probe per query kind

use std::sync::Arc;
use std::thread;

use ed25519_dalek::Signer;
use parking_lot::Mutex;
use tempfile::TempDir;

use update_host::{
    CandidateUpdate, ConfigKey, ConfigValue, DirectoryBundle, Ed25519Verifier, Host, InstallBlocker,
    InstallMode, RejectReason, Scheme, Verification,
};
use update_host_flow::{demo_bundle, host_with, public_key_b64, signing_key, DSA_PEM};

#[test]
fn test_no_keys_no_policy() {
    let (host, _) = host_with(demo_bundle());
    assert!(host.public_keys().is_empty());
    assert!(!host.has_update_security_policy());
    assert_eq!(host.legacy_key_configuration_key_name(), None);
}

#[test]
fn test_modern_key_declared() {
    let (host, _) = host_with(demo_bundle().with_value("SUPublicEDKey", "MFRKey123"));
    let keys = host.public_keys();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys.get(Scheme::Modern).map(|k| k.encoded()), Some("MFRKey123"));
    assert!(host.has_update_security_policy());
    assert_eq!(host.public_keys(), keys);
}

#[test]
fn test_legacy_key_only_declares_policy() {
    let (host, _) = host_with(demo_bundle().with_value("SUPublicDSAKey", DSA_PEM));
    let keys = host.public_keys();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains(Scheme::Legacy));
    assert!(host.has_update_security_policy());
    assert_eq!(host.legacy_key_configuration_key_name(), Some("SUPublicDSAKey"));

    let eligibility = host.evaluate(&CandidateUpdate::new(b"payload"), &Ed25519Verifier);
    assert_eq!(
        eligibility.verification,
        Verification::Rejected(RejectReason::MissingSignature(Scheme::Legacy))
    );
}

#[test]
fn test_bundled_require_flag_survives_override() {
    let (host, _) = host_with(demo_bundle().with_value("SURequireSignedUpdates", true));
    assert!(host.has_update_security_policy());

    host.set_override_bool(ConfigKey::RequireSignedUpdates, false);
    assert!(host.has_update_security_policy());
    let eligibility = host.evaluate(&CandidateUpdate::new(b"payload"), &Ed25519Verifier);
    assert_eq!(eligibility.verification, Verification::Rejected(RejectReason::NoTrustedKey));
    assert!(!eligibility.may_apply_in_place());
}

#[test]
fn test_override_beats_manifest_bool() {
    let (host, _) = host_with(demo_bundle().with_value("SUEnableAutomaticChecks", false));
    assert!(!host.lookup_bool("SUEnableAutomaticChecks"));
    host.set_override_bool("SUEnableAutomaticChecks", true);
    assert!(host.lookup_bool("SUEnableAutomaticChecks"));
}

#[test]
fn test_observer_invoked_once() {
    let (host, _) = host_with(demo_bundle());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    host.observe(["SUEnableAutomaticChecks"], move |key| sink.lock().push(key.to_string()));

    host.set_override_bool("SUEnableAutomaticChecks", false);
    assert_eq!(*seen.lock(), vec!["SUEnableAutomaticChecks".to_string()]);
}

#[test]
fn test_probe_timeout_fails_closed() {
    let (host, state) = host_with(demo_bundle());
    assert!(!host.is_on_read_only_volume());
    state.set_hang(true);
    assert!(host.is_on_read_only_volume());
    assert!(host.is_translocated());
}

#[test]
fn test_signed_update_applies_in_place() {
    let signing = signing_key();
    let (host, _) = host_with(demo_bundle().with_value("SUPublicEDKey", public_key_b64(&signing)));
    let payload = b"Demo-1.1.0.tar.xz";
    let signature = signing.sign(payload).to_bytes();

    let candidate = CandidateUpdate::new(payload).with_ed25519_signature(&signature);
    let eligibility = host.evaluate(&candidate, &Ed25519Verifier);
    assert_eq!(eligibility.verification, Verification::Verified(Scheme::Modern));
    assert_eq!(eligibility.install, InstallMode::InPlace);
    assert!(eligibility.may_apply_in_place());
    assert!(eligibility.reasons().is_empty());
}

#[test]
fn test_unsigned_update_rejected_under_policy() {
    let (host, _) = host_with(demo_bundle().with_value("SURequireSignedUpdates", true));
    let eligibility = host.evaluate(&CandidateUpdate::new(b"payload"), &Ed25519Verifier);
    assert_eq!(eligibility.verification, Verification::Rejected(RejectReason::NoTrustedKey));

    // A policy that comes from declared keys ignores the require flag entirely.
    let signing = signing_key();
    let (host, _) = host_with(demo_bundle().with_value("SUPublicEDKey", public_key_b64(&signing)));
    host.set_override_bool(ConfigKey::RequireSignedUpdates, false);
    assert!(host.has_update_security_policy());
    let eligibility = host.evaluate(&CandidateUpdate::new(b"payload"), &Ed25519Verifier);
    assert_eq!(
        eligibility.verification,
        Verification::Rejected(RejectReason::MissingSignature(Scheme::Modern))
    );
}

#[test]
fn test_tampered_payload_rejected() {
    let signing = signing_key();
    let (host, _) = host_with(demo_bundle().with_value("SUPublicEDKey", public_key_b64(&signing)));
    let signature = signing.sign(b"original").to_bytes();
    let candidate = CandidateUpdate::new(b"tampered").with_ed25519_signature(&signature);
    let eligibility = host.evaluate(&candidate, &Ed25519Verifier);
    assert_eq!(eligibility.verification, Verification::Rejected(RejectReason::BadSignature(Scheme::Modern)));
    assert!(!eligibility.may_apply_in_place());
}

#[test]
fn test_translocated_host_manual_only() {
    let signing = signing_key();
    let (host, state) = host_with(demo_bundle().with_value("SUPublicEDKey", public_key_b64(&signing)));
    state.set_translocated(true);
    state.set_read_only(true);
    let signature = signing.sign(b"payload").to_bytes();
    let candidate = CandidateUpdate::new(b"payload").with_ed25519_signature(&signature);

    let eligibility = host.evaluate(&candidate, &Ed25519Verifier);
    assert!(eligibility.verification.is_accepted());
    assert_eq!(
        eligibility.install,
        InstallMode::ManualOnly(vec![InstallBlocker::ReadOnlyVolume, InstallBlocker::Translocated])
    );
    assert!(!eligibility.may_apply_in_place());

    state.set_translocated(false);
    state.set_read_only(false);
    assert!(host.evaluate(&candidate, &Ed25519Verifier).may_apply_in_place());
}

#[test]
fn test_unsigned_update_without_policy() {
    let (host, _) = host_with(demo_bundle());
    let eligibility = host.evaluate(&CandidateUpdate::new(b"payload"), &Ed25519Verifier);
    assert_eq!(eligibility.verification, Verification::UnsignedAccepted);
    assert!(eligibility.may_apply_in_place());
}

#[test]
fn test_directory_bundle_with_key_file() {
    let temp = TempDir::new().expect("tempdir");
    let signing = signing_key();
    std::fs::write(
        temp.path().join("Info.toml"),
        format!(
            "CFBundleName = 'Demo'\nCFBundleVersion = '3'\nSUPublicEDKey = '{}'\nSUPublicDSAKeyFile = 'dsa_pub.pem'\n",
            public_key_b64(&signing)
        ),
    )
    .expect("write manifest");
    std::fs::create_dir(temp.path().join("Resources")).expect("resources dir");
    std::fs::write(
        temp.path().join("Resources").join("dsa_pub.pem"),
        format!("{DSA_PEM}\n"),
    )
    .expect("write key");

    let bundle = DirectoryBundle::open(temp.path()).expect("open bundle");
    let host = Host::new(Arc::new(bundle));
    assert_eq!(host.name(), "Demo");
    assert_eq!(host.version(), "3");
    let keys = host.public_keys();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|key| key.is_valid()));
    assert_eq!(host.legacy_key_configuration_key_name(), Some("SUPublicDSAKeyFile"));
    assert_eq!(host.legacy_key_file(), Some("dsa_pub.pem"));
    assert!(host.has_update_security_policy());
}

#[test]
fn test_concurrent_readers_and_ordered_writes() {
    let (host, _) = host_with(demo_bundle());
    let host = Arc::new(host);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = Arc::clone(&host);
    host.observe([ConfigKey::ScheduledCheckInterval], move |key| {
        let value = observer.lookup(key).and_then(|v| v.as_integer());
        sink.lock().push(value);
    });

    let reader = {
        let host = Arc::clone(&host);
        thread::spawn(move || {
            for _ in 0..200 {
                match host.lookup(ConfigKey::ScheduledCheckInterval) {
                    Some(ConfigValue::Integer(_)) => {}
                    other => panic!("torn read: {other:?}"),
                }
                let _ = host.public_keys();
            }
        })
    };

    for interval in 1..=50i64 {
        host.set_override(ConfigKey::ScheduledCheckInterval, Some(ConfigValue::Integer(interval)));
    }
    reader.join().expect("reader thread");

    let expected: Vec<Option<i64>> = (1..=50).map(Some).collect();
    assert_eq!(*seen.lock(), expected);
}

#[test]
fn test_hung_probe_not_respawned() {
    let (host, state) = host_with(demo_bundle());
    state.set_hang(true);
    for _ in 0..20 {
        assert!(host.is_on_read_only_volume());
    }
    assert_eq!(state.read_only_probes(), 1);
}
