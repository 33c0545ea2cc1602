//! Flow state codec
//!
//! Client-supplied flow state is carried through the provider redirect as a
//! plain base64-encoded JSON token. The encoding is reversible and URL-safe
//! once query-encoded, but it is **not** signed or encrypted: a client can
//! forge or tamper with it, so it exists only for flow continuity (carrying a
//! return URL, distinguishing web from native callbacks) and must never hold
//! trust-sensitive values.

use crate::errors::AuthError;
use crate::identity::AppVariant;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque flow state round-tripped through the provider redirect.
///
/// `app` and `returnUrl` are the two keys the middleware itself reads; any
/// other keys a caller encodes survive the round trip in `extra` and are
/// merged back into the completed identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<AppVariant>,
    #[serde(rename = "returnUrl", skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FlowState {
    /// True when there is no payload worth carrying through the redirect
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.app.is_none() && self.return_url.is_none() && self.extra.is_empty()
    }
}

/// Encode a JSON-serializable value into an opaque state token
///
/// # Errors
///
/// Returns `AuthError::MalformedState` if the value cannot be serialized to
/// JSON (non-string map keys, for instance).
pub fn encode_state<T: Serialize>(state: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(state)
        .map_err(|e| AuthError::MalformedState(format!("failed to serialize state: {e}")))?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Decode a state token back into its original value
///
/// An absent or empty token yields `Ok(None)` rather than an error: providers
/// omit the state parameter entirely when none was sent.
///
/// # Errors
///
/// Returns `AuthError::MalformedState` if the token is present but is not
/// base64-encoded JSON of the expected shape.
pub fn decode_state<T: DeserializeOwned>(token: Option<&str>) -> Result<Option<T>, AuthError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let json = general_purpose::STANDARD
        .decode(token)
        .map_err(|e| AuthError::MalformedState(format!("invalid base64: {e}")))?;
    let value = serde_json::from_slice(&json)
        .map_err(|e| AuthError::MalformedState(format!("invalid JSON payload: {e}")))?;
    Ok(Some(value))
}
