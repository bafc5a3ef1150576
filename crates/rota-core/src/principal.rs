//! Client principal decoding for edge-authenticated requests.
//!
//! The hosting edge authenticates the caller and forwards the resulting
//! identity assertion in the `x-ms-client-principal` header as
//! base64-encoded JSON. Decoding is all-or-nothing: malformed input is an
//! expected, recoverable condition and yields `None`, never a panic.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Single claim forwarded by the identity provider.
///
/// Part of the assertion contract but not consulted by the current
/// authorization checks. Wire keys are `typ`/`val`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type identifier.
    #[serde(default)]
    pub typ: String,
    /// Claim value.
    #[serde(default)]
    pub val: String,
}

/// Decoded identity assertion for the calling user.
///
/// Exists only as the decoded result of exactly one inbound header value;
/// never cached across requests or persisted as-is. Every field defaults
/// when absent from the decoded JSON, so an assertion without
/// `identityProvider` still decodes and is rejected by the provider check
/// rather than reported as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPrincipal {
    /// Authentication method used upstream (e.g. `"aad"`).
    #[serde(default)]
    pub identity_provider: String,
    /// Stable opaque subject identifier.
    #[serde(default)]
    pub user_id: String,
    /// Human-readable identifier, typically an email address. May be empty.
    #[serde(default)]
    pub user_details: String,
    /// Roles granted by the edge.
    #[serde(default)]
    pub user_roles: Vec<String>,
    /// Claims forwarded by the identity provider.
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl ClientPrincipal {
    /// Decodes a raw header value into a principal.
    ///
    /// Reverses the base64 transport encoding and parses the JSON assertion.
    /// Returns `None` on any failure at either step; no partial principals
    /// are produced.
    pub fn decode(header_value: &str) -> Option<Self> {
        let decoded = STANDARD.decode(header_value).ok()?;
        serde_json::from_slice(&decoded).ok()
    }

    /// Identity recorded with persisted schedule entries.
    ///
    /// Falls back `user_details` -> `user_id` -> `"unknown"`.
    pub fn submitter_identity(&self) -> &str {
        if !self.user_details.is_empty() {
            &self.user_details
        } else if !self.user_id.is_empty() {
            &self.user_id
        } else {
            "unknown"
        }
    }
}
