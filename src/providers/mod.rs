//! Provider client adapters
//!
//! One adapter per identity provider, each wrapping that provider's
//! authorization-URL construction, code exchange, and identity-claim
//! retrieval behind a uniform contract. Adapters hold only static
//! configuration set at construction; provider credentials obtained during
//! a completion call never escape the adapter boundary.

pub mod apple;
pub mod google;

pub use apple::AppleProvider;
pub use google::GoogleProvider;

use crate::errors::AuthError;
use crate::identity::{AppVariant, NameMap};
use crate::state::FlowState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Callback data delivered by a provider, via redirect query or form post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    /// Apple sends a JSON user profile blob in the form post on first login
    pub user: Option<String>,
}

/// Identity claims resolved from a completed token exchange.
///
/// This is what an adapter is allowed to return: normalized claims only,
/// with the access token or signed assertion consumed internally.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub auth_id: String,
    pub email: String,
    pub names: NameMap,
}

/// Uniform contract over heterogeneous identity providers
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier recorded on the canonical identity
    fn provider_name(&self) -> &'static str;

    /// Default flow state attached on the begin path, before any
    /// caller-supplied additions. May be empty, in which case the state
    /// parameter is omitted entirely.
    fn begin_state(&self) -> FlowState;

    /// Whether completion arrives as a form post rather than a code on the
    /// redirect query
    fn completes_via_form_post(&self) -> bool;

    /// Construct the provider's authorization URL. Pure URL construction,
    /// never a network call.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when required settings are absent.
    fn begin_authorization(
        &self,
        app: AppVariant,
        state: Option<&str>,
    ) -> Result<String, AuthError>;

    /// Exchange an authorization code for identity claims.
    ///
    /// A single provider round trip; failures surface immediately with no
    /// retries (authorization codes are single-use).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` when the provider rejects the code,
    /// `AuthError::ProviderUnavailable` on transport failure, and
    /// `AuthError::InvalidResponse` when the reply cannot be interpreted.
    async fn complete_authorization(
        &self,
        code: &str,
        app: AppVariant,
    ) -> Result<TokenIdentity, AuthError>;

    /// Names supplied inline in the callback payload, for providers that
    /// deliver profile data with the form post instead of a follow-up lookup
    fn inline_names(&self, callback: &CallbackPayload) -> NameMap {
        let _ = callback;
        NameMap::new()
    }
}
