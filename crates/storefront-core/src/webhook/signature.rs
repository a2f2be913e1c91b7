//! Webhook signature generation and verification.
//!
//! The provider signs each delivery with HMAC-SHA256 under a shared secret
//! and sends the lowercase hex digest in a header, either bare (`<hex>`) or
//! tagged with the algorithm (`sha256=<hex>`).
//!
//! By default the signed bytes are the canonical JSON form of the payload,
//! the text `JSON.stringify` produces for the parsed body: numbers printed
//! as JavaScript doubles, array-index keys first. A body that was pretty-printed, re-spaced
//! or re-serialised in transit therefore still verifies. [`SigningMode::Raw`]
//! signs the request body verbatim instead.

use super::canonical::to_canonical_json;
use crate::ParseError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::secret::SecretValue;

type HmacSha256 = Hmac<Sha256>;

/// Value returned by [`generate_signature`] when the secret is empty.
///
/// Never accepted by [`verify_signature`], so a misconfigured receiver
/// rejects every delivery.
pub const NO_SECRET_SENTINEL: &str = "sig_no_secret_configured";

// ============================================================================
// Algorithm and Mode
// ============================================================================

/// Signature algorithms accepted in a tagged signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256, tag `sha256`
    Sha256,
}

impl SignatureAlgorithm {
    /// Header tag for this algorithm
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sha256") {
            Ok(Self::Sha256)
        } else {
            Err(ParseError::InvalidFormat {
                expected: "sha256".to_string(),
                actual: s.to_string(),
            })
        }
    }
}

/// Which bytes the HMAC is computed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    /// `JSON.stringify` form of the parsed payload
    #[default]
    Canonical,
    /// Request body bytes exactly as received
    Raw,
}

// ============================================================================
// Presented Signature
// ============================================================================

/// Errors parsing a signature header value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is empty")]
    Empty,

    #[error("Unsupported signature algorithm '{tag}'")]
    UnsupportedAlgorithm { tag: String },
}

/// A signature header value split into algorithm and digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentedSignature<'a> {
    algorithm: SignatureAlgorithm,
    digest: &'a str,
}

impl<'a> PresentedSignature<'a> {
    /// Parse `<hex>` or `<tag>=<hex>`.
    ///
    /// The digest is not decoded here: comparison happens on the hex text so
    /// that any altered character, including a case change, is a mismatch.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::Empty`] if there is no digest
    /// - [`SignatureError::UnsupportedAlgorithm`] if the tag is not a known algorithm
    pub fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let header = header.trim();

        let (algorithm, digest) = match header.split_once('=') {
            Some((tag, digest)) => {
                let algorithm = tag.trim().parse::<SignatureAlgorithm>().map_err(|_| {
                    SignatureError::UnsupportedAlgorithm {
                        tag: tag.chars().take(16).collect(),
                    }
                })?;
                (algorithm, digest.trim())
            }
            None => (SignatureAlgorithm::Sha256, header),
        };

        if digest.is_empty() {
            return Err(SignatureError::Empty);
        }

        Ok(Self { algorithm, digest })
    }

    /// Algorithm named by the header (SHA-256 for bare digests)
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Hex digest with any tag removed
    pub fn digest(&self) -> &'a str {
        self.digest
    }
}

// ============================================================================
// Generation and Verification
// ============================================================================

/// Canonical bytes signed for a JSON payload.
fn canonical_bytes(payload: &serde_json::Value) -> Vec<u8> {
    to_canonical_json(payload).into_bytes()
}

/// Hex HMAC-SHA256 of `bytes`, or `None` when no usable secret is configured.
fn compute_hex_digest(bytes: &[u8], secret: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(bytes);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of the expected digest with a presented header.
fn matches_presented(expected: Option<String>, signature: &str) -> bool {
    let Some(expected) = expected else {
        return false;
    };

    let presented = match PresentedSignature::parse(signature) {
        Ok(presented) => presented,
        Err(_) => return false,
    };

    let presented = presented.digest().as_bytes();
    let expected = expected.as_bytes();

    // Length is not secret: every valid digest has the same length.
    if presented.len() != expected.len() {
        return false;
    }

    presented.ct_eq(expected).into()
}

/// Compute the signature of a JSON payload.
///
/// Serializes `payload` the way `JSON.stringify` would and returns the
/// lowercase hex HMAC-SHA256 under `secret`. Returns [`NO_SECRET_SENTINEL`]
/// when `secret` is empty.
///
/// # Examples
///
/// ```rust
/// use storefront_core::webhook::{generate_signature, NO_SECRET_SENTINEL};
///
/// let payload = serde_json::json!({"event_type": "checkout.session.failed", "data": {}});
/// assert_eq!(generate_signature(&payload, "s3cret").len(), 64);
/// assert_eq!(generate_signature(&payload, ""), NO_SECRET_SENTINEL);
/// ```
pub fn generate_signature(payload: &serde_json::Value, secret: &str) -> String {
    generate_signature_for_bytes(&canonical_bytes(payload), secret)
}

/// Compute the signature of raw payload bytes.
///
/// Returns [`NO_SECRET_SENTINEL`] when `secret` is empty.
pub fn generate_signature_for_bytes(payload: &[u8], secret: &str) -> String {
    compute_hex_digest(payload, secret).unwrap_or_else(|| NO_SECRET_SENTINEL.to_string())
}

/// Verify a presented signature against a JSON payload.
///
/// Returns `false`, never an error, when the signature does not match, the
/// header is malformed or names an unsupported algorithm, or `secret` is
/// empty.
pub fn verify_signature(payload: &serde_json::Value, signature: &str, secret: &str) -> bool {
    verify_signature_for_bytes(&canonical_bytes(payload), signature, secret)
}

/// Verify a presented signature against raw payload bytes.
pub fn verify_signature_for_bytes(payload: &[u8], signature: &str, secret: &str) -> bool {
    matches_presented(compute_hex_digest(payload, secret), signature)
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Verifies webhook signatures with the configured shared secret.
///
/// # Security
///
/// - Uses constant-time comparison to prevent timing attacks
/// - Never logs secrets or signature values
/// - Rejects everything when the secret is empty
///
/// # Examples
///
/// ```rust
/// use storefront_core::webhook::{SignatureVerifier, SigningMode};
/// use storefront_core::SecretValue;
///
/// let verifier = SignatureVerifier::new(SecretValue::from("whsec_test"));
/// let payload = serde_json::json!({"event_type": "checkout.session.completed", "data": {}});
/// let body = serde_json::to_vec(&payload).unwrap();
///
/// let signature = verifier.sign(&payload, &body);
/// assert!(verifier.verify(&payload, &body, &format!("sha256={}", signature)));
/// assert_eq!(verifier.mode(), SigningMode::Canonical);
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: SecretValue,
    mode: SigningMode,
}

impl SignatureVerifier {
    /// Create a verifier that signs the canonical JSON form.
    pub fn new(secret: SecretValue) -> Self {
        Self {
            secret,
            mode: SigningMode::Canonical,
        }
    }

    /// Select which bytes are signed.
    pub fn with_mode(mut self, mode: SigningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Signing mode in effect
    pub fn mode(&self) -> SigningMode {
        self.mode
    }

    /// `false` when the secret is empty and every delivery will be rejected
    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Compute the expected signature for a delivery.
    ///
    /// `payload` is the parsed body and `raw` the body as received; which one
    /// is signed depends on [`SigningMode`].
    pub fn sign(&self, payload: &serde_json::Value, raw: &[u8]) -> String {
        match self.mode {
            SigningMode::Canonical => generate_signature(payload, self.secret.expose_secret()),
            SigningMode::Raw => generate_signature_for_bytes(raw, self.secret.expose_secret()),
        }
    }

    /// Verify a presented signature header for a delivery.
    pub fn verify(&self, payload: &serde_json::Value, raw: &[u8], signature: &str) -> bool {
        match self.mode {
            SigningMode::Canonical => {
                verify_signature(payload, signature, self.secret.expose_secret())
            }
            SigningMode::Raw => {
                verify_signature_for_bytes(raw, signature, self.secret.expose_secret())
            }
        }
    }
}

// Security: Don't expose secrets in debug output
impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &crate::secret::REDACTED)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
