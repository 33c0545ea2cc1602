//! Canonical identity model and per-provider claim normalization
//!
//! Each provider returns identity data in its own shape: Google splits the
//! email lookup from a People-API name lookup, Apple delivers an optional
//! inline profile blob on first authorization. The normalizers here are pure
//! functions that map those raw shapes into one canonical record so provider
//! field names never leak past the adapter boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name fields of a canonical identity.
///
/// Always present on a completed identity, possibly empty. Holds the
/// provider's native keys plus the provider-agnostic `firstName`/`lastName`
/// pair so downstream consumers need not special-case providers.
pub type NameMap = serde_json::Map<String, Value>;

/// Which client context initiated the flow.
///
/// Providers with multiple app registrations present a different client
/// identifier per variant (Apple distinguishes a web service ID from a
/// native app ID). Determined by flow state when present; a missing state on
/// completion implies a native-client callback, since native clients cannot
/// round-trip a browser redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppVariant {
    Web,
    Ios,
}

impl AppVariant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ios => "ios",
        }
    }
}

/// The normalized output of a completed sign-in flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalIdentity {
    pub provider: String,
    pub app: AppVariant,
    pub auth_id: String,
    pub email: String,
    #[serde(default)]
    pub names: NameMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// Caller-defined state keys merged back from the redirect round trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Name parts of the Apple inline `user` form field
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppleUserName {
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// User profile blob Apple posts back on first authorization only
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppleUserInfo {
    pub name: Option<AppleUserName>,
    pub email: Option<String>,
}

/// Select the name record to keep from a Google People response.
///
/// The record flagged primary wins; when none is flagged, the first record
/// in the returned ordered sequence is used.
#[must_use]
pub fn select_name_record(records: &[Value]) -> Option<&Value> {
    records
        .iter()
        .find(|record| record["metadata"]["primary"] == Value::Bool(true))
        .or_else(|| records.first())
}

/// Normalize a Google People `names[]` response into canonical name parts.
///
/// Keeps every native key of the selected record except its `metadata`, and
/// adds `firstName`/`lastName` aliases of `givenName`/`familyName`.
#[must_use]
pub fn google_names(records: &[Value]) -> NameMap {
    let Some(Value::Object(record)) = select_name_record(records) else {
        return NameMap::new();
    };

    let mut names: NameMap = record
        .iter()
        .filter(|(key, _)| key.as_str() != "metadata")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if let Some(given) = names.get("givenName").cloned() {
        names.insert("firstName".to_string(), given);
    }
    if let Some(family) = names.get("familyName").cloned() {
        names.insert("lastName".to_string(), family);
    }
    names
}

/// Parse the Apple inline `user` blob into canonical name parts.
///
/// The blob arrives as a JSON string in the callback form post. A missing
/// or unparsable blob yields an empty map - optional profile data never
/// fails the flow.
#[must_use]
pub fn apple_inline_names(user: Option<&str>) -> NameMap {
    let Some(info) = user.and_then(|json| serde_json::from_str::<AppleUserInfo>(json).ok()) else {
        return NameMap::new();
    };

    let mut names = NameMap::new();
    if let Some(name) = info.name {
        if let Some(first) = name.first_name {
            names.insert("firstName".to_string(), Value::String(first));
        }
        if let Some(last) = name.last_name {
            names.insert("lastName".to_string(), Value::String(last));
        }
    }
    names
}
