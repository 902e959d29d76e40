//! Webhook signature verification.
//!
//! RevenueCat signs each delivery with HMAC-SHA256 over the raw request body;
//! the hex digest arrives in the `X-RevenueCat-Signature` header. Verification
//! must run against the raw bytes before any JSON parsing.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Verifier for RevenueCat webhook signatures.
///
/// Holds the shared signing secret from process configuration; constructed
/// once at startup and injected into the webhook processor.
pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies a signature header against the raw request body.
    ///
    /// Returns `false` on a missing digest, non-hex header, or mismatch.
    /// Never errors: an unauthenticated request carries no trustworthy
    /// identity, so there is nothing more precise to report.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        let provided = match hex::decode(signature_header.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let expected = self.compute_signature(payload);
        constant_time_compare(&expected, &provided)
    }

    /// Computes the HMAC-SHA256 digest of the payload.
    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex signature for a payload, for use in test fixtures.
pub fn compute_test_signature(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
