// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Signature verification seam consumed by the eligibility check.
//!
//! The host decides *which* key and scheme apply; the arithmetic lives behind
//! [`SignatureVerifier`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("signature does not match")]
    InvalidSignature,
    #[error("public key rejected by backend")]
    InvalidKey,
    #[error("scheme not supported by this verifier")]
    Unsupported,
    #[error("verifier backend failure: {0}")]
    Backend(&'static str),
}

pub trait SignatureVerifier {
    fn verify_ed25519(
        &self,
        public_key: &[u8; 32],
        message: &[u8],
        signature: &[u8; 64],
    ) -> Result<(), VerifyError>;

    /// `public_key_der` is the SubjectPublicKeyInfo body of the bundled PEM key.
    fn verify_dsa(
        &self,
        public_key_der: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), VerifyError>;
}

/// Ed25519 verifier backed by `ed25519-dalek`. Legacy DSA is reported as unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify_ed25519(
        &self,
        public_key: &[u8; 32],
        message: &[u8],
        signature: &[u8; 64],
    ) -> Result<(), VerifyError> {
        use ed25519_dalek::{Signature, VerifyingKey};

        let key = VerifyingKey::from_bytes(public_key).map_err(|_| VerifyError::InvalidKey)?;
        let sig = Signature::from_bytes(signature);
        key.verify_strict(message, &sig).map_err(|_| VerifyError::InvalidSignature)
    }

    fn verify_dsa(
        &self,
        _public_key_der: &[u8],
        _message: &[u8],
        _signature: &[u8],
    ) -> Result<(), VerifyError> {
        Err(VerifyError::Unsupported)
    }
}
