// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update security policy and eligibility decision
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 8 unit tests (+ tests/update_host_flow integration)
//!
//! A host has a security policy when it declares any public key or sets
//! `SURequireSignedUpdates`. Under a policy an unsigned update is always rejected.
//!
//! Scheme selection: when a modern key is declared the update must carry a valid
//! Ed25519 signature; a legacy DSA signature is consulted only when no modern key
//! is declared.

use std::fmt;

use log::{info, warn};

use crate::environment::CapabilitySnapshot;
use crate::keys::{KeyMaterial, Scheme};
use crate::verify::{SignatureVerifier, VerifyError};

/// Inputs the update pipeline supplies for one candidate archive.
#[derive(Debug, Clone, Copy)]
pub struct CandidateUpdate<'a> {
    pub payload: &'a [u8],
    pub ed25519_signature: Option<&'a [u8]>,
    pub dsa_signature: Option<&'a [u8]>,
}

impl<'a> CandidateUpdate<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, ed25519_signature: None, dsa_signature: None }
    }

    pub fn with_ed25519_signature(mut self, signature: &'a [u8]) -> Self {
        self.ed25519_signature = Some(signature);
        self
    }

    pub fn with_dsa_signature(mut self, signature: &'a [u8]) -> Self {
        self.dsa_signature = Some(signature);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Policy requires a signature for the selected scheme and none was supplied.
    MissingSignature(Scheme),
    /// Signed updates are required but the host declares no key to check against.
    NoTrustedKey,
    /// The declared key for the scheme does not decode.
    MalformedKey(Scheme),
    /// The signature did not verify against the declared key.
    BadSignature(Scheme),
    /// The verifier cannot check this scheme.
    VerifierUnavailable(Scheme),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingSignature(scheme) => write!(f, "update carries no {scheme} signature"),
            RejectReason::NoTrustedKey => f.write_str("signed updates required but no public key is declared"),
            RejectReason::MalformedKey(scheme) => write!(f, "declared {scheme} public key is malformed"),
            RejectReason::BadSignature(scheme) => write!(f, "{scheme} signature does not verify"),
            RejectReason::VerifierUnavailable(scheme) => write!(f, "no verifier available for {scheme}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified(Scheme),
    /// No security policy applies; the update is accepted without a signature check.
    UnsignedAccepted,
    Rejected(RejectReason),
}

impl Verification {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verification::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallBlocker {
    ReadOnlyVolume,
    Translocated,
}

impl fmt::Display for InstallBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallBlocker::ReadOnlyVolume => f.write_str("application is on a read-only volume"),
            InstallBlocker::Translocated => f.write_str("application is running translocated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMode {
    InPlace,
    ManualOnly(Vec<InstallBlocker>),
}

impl InstallMode {
    pub fn from_snapshot(snapshot: CapabilitySnapshot) -> Self {
        let mut blockers = Vec::new();
        if snapshot.read_only_volume {
            blockers.push(InstallBlocker::ReadOnlyVolume);
        }
        if snapshot.translocated {
            blockers.push(InstallBlocker::Translocated);
        }
        if blockers.is_empty() {
            InstallMode::InPlace
        } else {
            InstallMode::ManualOnly(blockers)
        }
    }
}

/// Outcome of [`crate::Host::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub verification: Verification,
    pub install: InstallMode,
}

impl Eligibility {
    /// True iff the update is accepted and may replace the host in place.
    pub fn may_apply_in_place(&self) -> bool {
        self.verification.is_accepted() && self.install == InstallMode::InPlace
    }

    /// Every reason the update cannot be applied in place, verification first.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if let Verification::Rejected(reason) = &self.verification {
            reasons.push(reason.to_string());
        }
        if let InstallMode::ManualOnly(blockers) = &self.install {
            reasons.extend(blockers.iter().map(ToString::to_string));
        }
        reasons
    }
}

/// `true` iff any key is declared or signed updates are explicitly required.
pub fn has_security_policy(keys: &KeyMaterial, require_signed: bool) -> bool {
    !keys.is_empty() || require_signed
}

/// Decides whether `candidate` passes the host's trust policy.
pub fn verify_candidate(
    keys: &KeyMaterial,
    require_signed: bool,
    candidate: &CandidateUpdate<'_>,
    verifier: &dyn SignatureVerifier,
) -> Verification {
    if let Some(key) = keys.get(Scheme::Modern) {
        let Some(signature) = candidate.ed25519_signature else {
            return Verification::Rejected(RejectReason::MissingSignature(Scheme::Modern));
        };
        let Some(public) = key.ed25519_bytes() else {
            warn!("rejecting update: declared ed25519 key {} is malformed", key.fingerprint());
            return Verification::Rejected(RejectReason::MalformedKey(Scheme::Modern));
        };
        let Ok(signature) = <&[u8; 64]>::try_from(signature) else {
            return Verification::Rejected(RejectReason::BadSignature(Scheme::Modern));
        };
        return outcome(Scheme::Modern, verifier.verify_ed25519(&public, candidate.payload, signature));
    }

    if let Some(key) = keys.get(Scheme::Legacy) {
        let Some(signature) = candidate.dsa_signature else {
            return Verification::Rejected(RejectReason::MissingSignature(Scheme::Legacy));
        };
        let Some(der) = key.decoded() else {
            warn!("rejecting update: declared dsa key {} is malformed", key.fingerprint());
            return Verification::Rejected(RejectReason::MalformedKey(Scheme::Legacy));
        };
        return outcome(Scheme::Legacy, verifier.verify_dsa(der, candidate.payload, signature));
    }

    if require_signed {
        return Verification::Rejected(RejectReason::NoTrustedKey);
    }
    info!("host declares no update security policy; accepting update without signature check");
    Verification::UnsignedAccepted
}

fn outcome(scheme: Scheme, result: Result<(), VerifyError>) -> Verification {
    match result {
        Ok(()) => Verification::Verified(scheme),
        Err(VerifyError::Unsupported) | Err(VerifyError::Backend(_)) => {
            Verification::Rejected(RejectReason::VerifierUnavailable(scheme))
        }
        Err(VerifyError::InvalidSignature) | Err(VerifyError::InvalidKey) => {
            Verification::Rejected(RejectReason::BadSignature(scheme))
        }
    }
}
