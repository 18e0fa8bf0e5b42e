//! Scanned QR payload parsing and integrity verification.
//!
//! A QR payload is a JSON object carrying a student identity, either nested
//! under a `data` key or at the top level, plus an optional `hash` token.
//! The token is the first 16 hex characters of the SHA-256 digest of the
//! canonical identity JSON with the school of origin appended, which binds
//! a signed payload to a single school. Canonical form is compact JSON with
//! lexicographically sorted keys, so the minter and the verifier agree on
//! the digested bytes regardless of how a scanner reorders keys.
//!
//! Verification is tolerant of unsigned payloads: an empty or absent token
//! is accepted, a present-but-wrong token is rejected as tampering.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::record::StudentIdentity;

/// Length of the integrity token in hex characters.
const TOKEN_LEN: usize = 16;

/// A parsed QR payload, ready for verification.
#[derive(Debug, Clone)]
pub struct ScannedPayload {
    /// The carried identity, with placeholder defaults filled in.
    pub student: StudentIdentity,
    /// The identity object as scanned, before defaults. Tokens are
    /// computed over this value.
    identity: Value,
    /// The provided integrity token; empty when the payload is unsigned.
    token: String,
}

impl ScannedPayload {
    /// Parse raw scanned text into a payload.
    ///
    /// The identity object is the `data` member when one is present,
    /// otherwise the top-level object itself with the `hash` member
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] when the text is not a JSON
    /// object, the `data` member is not an object, or the `hash` member is
    /// not a string.
    pub fn parse(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| Error::malformed_payload(format!("not valid JSON: {e}")))?;
        let Value::Object(mut root) = root else {
            return Err(Error::malformed_payload("top level is not a JSON object"));
        };

        let token = match root.remove("hash") {
            None => String::new(),
            Some(Value::String(token)) => token,
            Some(_) => {
                return Err(Error::malformed_payload("hash member is not a string"));
            }
        };

        let identity = match root.remove("data") {
            Some(data @ Value::Object(_)) => data,
            Some(_) => {
                return Err(Error::malformed_payload("data member is not an object"));
            }
            None => Value::Object(root),
        };

        let student: StudentIdentity = serde_json::from_value(identity.clone())
            .map_err(|e| Error::malformed_payload(format!("identity fields unusable: {e}")))?;

        Ok(Self {
            student,
            identity,
            token,
        })
    }

    /// The provided integrity token, empty for unsigned payloads.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Check the payload's integrity token against the school it is being
    /// recorded under.
    ///
    /// Unsigned payloads (empty token) always pass. This is a pure check;
    /// nothing is persisted on either outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TamperedPayload`] when a token is present and does
    /// not match the expected value for `school`.
    pub fn verify(&self, school: &str) -> Result<()> {
        if self.token.is_empty() || self.token == expected_token(&self.identity, school) {
            Ok(())
        } else {
            Err(Error::TamperedPayload)
        }
    }
}

/// Compute the integrity token for an identity object under a school.
///
/// The token is the first 16 lowercase hex characters of
/// `SHA-256(canonical_identity_json || school)`.
#[must_use]
pub fn expected_token(identity: &Value, school: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.to_string().as_bytes());
    hasher.update(school.as_bytes());
    let mut token = hex::encode(hasher.finalize());
    token.truncate(TOKEN_LEN);
    token
}

/// Mint the payload text for a student identity bound to a school.
///
/// The result is `{"data": <identity>, "hash": <token>}` and verifies
/// cleanly when scanned under the same school.
///
/// # Errors
///
/// Returns [`Error::Json`] if the identity fails to serialize, which does
/// not happen for well-formed identities.
pub fn mint_payload(student: &StudentIdentity, school: &str) -> Result<String> {
    let identity = serde_json::to_value(student)?;
    let token = expected_token(&identity, school);
    let payload = serde_json::json!({
        "data": identity,
        "hash": token,
    });
    Ok(payload.to_string())
}
