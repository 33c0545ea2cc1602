//! Authentication flow orchestration
//!
//! Single entry point per provider, invoked per request. Classifies the
//! request into "begin flow" or "complete flow" by HTTP method, drives the
//! provider adapter and the normalizer, and returns an explicit outcome the
//! transport layer translates into a redirect, an attached identity, or a
//! status code. Each invocation is stateless; the only thing carried across
//! the provider round trip is the encoded state token.

use crate::errors::AuthError;
use crate::identity::{AppVariant, CanonicalIdentity};
use crate::providers::{CallbackPayload, ProviderAdapter};
use crate::state::{decode_state, encode_state, FlowState};
use actix_web::http::Method;

/// Framework-independent view of the parts of a request the flow reads
#[derive(Debug, Clone)]
pub struct FlowRequest {
    pub method: Method,
    /// Explicit `return` query parameter
    pub return_url: Option<String>,
    /// `Referer` header, the fallback return URL source
    pub referrer: Option<String>,
    pub callback: CallbackPayload,
}

/// Successful result of one flow invocation
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// Begin: send the user agent to the provider's authorization endpoint
    Redirect(String),
    /// Complete: hand the canonical identity to the downstream continuation
    Identity(CanonicalIdentity),
}

/// Drive one flow invocation against the given provider adapter
///
/// # Errors
///
/// Returns `AuthError::MethodNotAllowed` for methods outside the provider's
/// flow, and the adapter's or codec's classified failure for everything that
/// goes wrong on the complete path. Replaying an authorization code is not
/// idempotent - providers invalidate codes after first use.
pub async fn handle_flow(
    adapter: &dyn ProviderAdapter,
    request: &FlowRequest,
) -> Result<FlowOutcome, AuthError> {
    if request.method == Method::GET {
        // Providers that complete over the redirect channel deliver the
        // code back on the same GET route the flow begins on
        if !adapter.completes_via_form_post() && request.callback.code.is_some() {
            return complete_flow(adapter, request).await;
        }
        return begin_flow(adapter, request);
    }
    if request.method == Method::POST && adapter.completes_via_form_post() {
        return complete_flow(adapter, request).await;
    }
    Err(AuthError::MethodNotAllowed)
}

/// Begin: derive flow state, encode it, and construct the redirect.
///
/// Never blocks beyond URL construction - no network call on this path.
fn begin_flow(
    adapter: &dyn ProviderAdapter,
    request: &FlowRequest,
) -> Result<FlowOutcome, AuthError> {
    let mut state = adapter.begin_state();
    if let Some(return_url) = request
        .return_url
        .clone()
        .or_else(|| request.referrer.clone())
    {
        state.return_url = Some(return_url);
    }

    let token = if state.is_empty() {
        None
    } else {
        Some(encode_state(&state)?)
    };
    let url = adapter.begin_authorization(AppVariant::Web, token.as_deref())?;
    Ok(FlowOutcome::Redirect(url))
}

/// Complete: decode state, exchange the code, normalize, merge.
async fn complete_flow(
    adapter: &dyn ProviderAdapter,
    request: &FlowRequest,
) -> Result<FlowOutcome, AuthError> {
    if let Some(error) = &request.callback.error {
        return Err(AuthError::InvalidGrant(error.clone()));
    }

    let state: FlowState = decode_state(request.callback.state.as_deref())?.unwrap_or_default();
    // Missing state implies a native-client callback: native clients cannot
    // round-trip a browser redirect
    let app = state.app.unwrap_or(AppVariant::Ios);

    let code = request.callback.code.as_deref().ok_or_else(|| {
        AuthError::InvalidResponse("callback missing authorization code".to_string())
    })?;

    let token_identity = adapter.complete_authorization(code, app).await?;

    // Token-derived names win; the inline callback blob only fills the gap
    let names = if token_identity.names.is_empty() {
        adapter.inline_names(&request.callback)
    } else {
        token_identity.names
    };

    Ok(FlowOutcome::Identity(CanonicalIdentity {
        provider: adapter.provider_name().to_string(),
        app,
        auth_id: token_identity.auth_id,
        email: token_identity.email,
        names,
        return_url: state.return_url,
        extra: state.extra,
    }))
}
