// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update host library (trust anchors, layered configuration, install eligibility)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: unit tests per module + integration tests (via tests/update_host_flow)
//!   - configuration precedence and change notification
//!   - key material extraction and security policy gate
//!   - fail-closed environment probes
//!   - eligibility decisions end to end
//!
//! PUBLIC API:
//!   - Host / HostBuilder: per-application facade for the update pipeline
//!   - BundleInspector, PreferenceStore, EnvironmentProbe, SignatureVerifier: injected seams
//!   - KeyMaterial, Eligibility: trust and decision types
//!
//! DEPENDENCIES:
//!   - parking_lot: override-store and subscription locking
//!   - ed25519-dalek, base64, sha2, hex: key validation and fingerprints
//!   - serde + toml: bundle manifest and host options
//!   - libc: mount flags for the read-only volume probe
//!   - log, thiserror: diagnostics and error types

#![deny(unsafe_code)]

pub mod bundle;
pub mod config;
pub mod environment;
pub mod host;
pub mod identity;
pub mod key;
pub mod keys;
pub mod notify;
pub mod policy;
pub mod resolver;
pub mod store;
pub mod value;
pub mod verify;

pub use bundle::{BundleInspector, DirectoryBundle, Manifest, ManifestError, StaticBundle};
pub use config::{Defaults, HostOptions, DEFAULT_PROBE_TIMEOUT};
pub use environment::{
    CapabilityDetector, CapabilitySnapshot, EnvironmentProbe, ProbeError, SystemProbe,
};
pub use host::{Host, HostBuilder};
pub use identity::HostIdentity;
pub use key::ConfigKey;
pub use keys::{KeyMaterial, KeyStatus, LegacyKeySource, PublicKey, Scheme};
pub use notify::{ChangeHandler, ChangeHub, SubscriptionId};
pub use policy::{
    CandidateUpdate, Eligibility, InstallBlocker, InstallMode, RejectReason, Verification,
};
pub use resolver::Resolver;
pub use store::{MemoryPreferenceStore, PreferenceStore};
pub use value::ConfigValue;
pub use verify::Ed25519Verifier;
pub use verify::{SignatureVerifier, VerifyError};
