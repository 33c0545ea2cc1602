//! Apple adapter
//!
//! Apple delivers completion as a form post and authenticates the token
//! exchange with a short-lived ES256-signed client assertion instead of a
//! static secret. Which client identifier the assertion is minted for
//! depends on the app variant: web flows present the service ID, native
//! flows the app ID. Profile data, when Apple sends it at all, arrives
//! inline in the callback form on first authorization only.

use crate::errors::AuthError;
use crate::identity::{apple_inline_names, AppVariant, NameMap};
use crate::providers::{CallbackPayload, ProviderAdapter, TokenIdentity};
use crate::settings::AppleSettings;
use crate::state::FlowState;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use serde::Deserialize;
use std::collections::HashMap;

pub const APPLE_AUTHORIZE_URL: &str = "https://appleid.apple.com/auth/authorize";
pub const APPLE_TOKEN_URL: &str = "https://appleid.apple.com/auth/token";

/// Audience claim of the client assertion
pub const APPLE_TOKEN_AUDIENCE: &str = "https://appleid.apple.com";

/// Client assertion lifetime. Apple caps client secrets at six months.
const CLIENT_SECRET_TTL_DAYS: i64 = 180;

#[derive(Debug, Deserialize)]
struct AppleTokenResponse {
    id_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppleIdTokenClaims {
    email: Option<String>,
    aud: Option<String>,
}

/// Apple Sign In client adapter
#[derive(Debug)]
pub struct AppleProvider {
    settings: AppleSettings,
    private_key_pem: String,
    http_client: reqwest::Client,
}

impl AppleProvider {
    /// Create an adapter from settings, resolving the private key up front.
    ///
    /// Configuration problems are fatal here, at startup, rather than
    /// per-request: the begin path must have no failure surface.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the team id, key id, redirect
    /// URI, or private key is missing, or the key file cannot be read.
    pub fn new(settings: AppleSettings) -> Result<Self, AuthError> {
        settings.get_team_id().ok_or_else(|| {
            AuthError::Configuration("team_id not configured for Apple provider".to_string())
        })?;
        settings.get_key_id().ok_or_else(|| {
            AuthError::Configuration("key_id not configured for Apple provider".to_string())
        })?;
        settings.redirect_uri.as_ref().ok_or_else(|| {
            AuthError::Configuration("redirect_uri not configured for Apple provider".to_string())
        })?;
        if settings.app_id.is_none() && settings.service_id.is_none() {
            return Err(AuthError::Configuration(
                "neither app_id nor service_id configured for Apple provider".to_string(),
            ));
        }
        let private_key_pem = settings.resolve_private_key()?;
        Ok(Self {
            settings,
            private_key_pem,
            http_client: reqwest::Client::new(),
        })
    }

    fn authorization_endpoint(&self) -> &str {
        self.settings
            .authorization_endpoint
            .as_deref()
            .unwrap_or(APPLE_AUTHORIZE_URL)
    }

    fn token_endpoint(&self) -> &str {
        self.settings
            .token_endpoint
            .as_deref()
            .unwrap_or(APPLE_TOKEN_URL)
    }

    /// Client identifier to present for the given app variant
    fn client_id_for(&self, app: AppVariant) -> String {
        let preferred = match app {
            AppVariant::Ios => self.settings.app_id.clone(),
            AppVariant::Web => self.settings.service_id.clone(),
        };
        preferred
            .or_else(|| self.settings.service_id.clone())
            .or_else(|| self.settings.app_id.clone())
            .unwrap_or_default()
    }

    /// Mint the ES256-signed client assertion Apple accepts as a client
    /// secret.
    ///
    /// A pure function of configuration and the current time. Failure here
    /// is fatal to the request, never retried.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the private key cannot be
    /// parsed or the claims cannot be serialized.
    pub fn client_secret(&self, client_id: &str) -> Result<String, AuthError> {
        let team_id = self.settings.get_team_id().unwrap_or_default();
        let key_id = self.settings.get_key_id().unwrap_or_default();

        let signing_key = SigningKey::from_pkcs8_pem(&self.private_key_pem)
            .map_err(|e| AuthError::Configuration(format!("failed to parse private key: {e}")))?;

        let header = serde_json::json!({
            "alg": "ES256",
            "kid": key_id,
            "typ": "JWT"
        });

        let now = Utc::now();
        let exp = now + Duration::days(CLIENT_SECRET_TTL_DAYS);
        let claims = serde_json::json!({
            "iss": team_id,
            "sub": client_id,
            "iat": now.timestamp(),
            "exp": exp.timestamp(),
            "aud": APPLE_TOKEN_AUDIENCE,
        });

        let header_json = serde_json::to_string(&header)
            .map_err(|e| AuthError::Configuration(format!("failed to serialize header: {e}")))?;
        let claims_json = serde_json::to_string(&claims)
            .map_err(|e| AuthError::Configuration(format!("failed to serialize claims: {e}")))?;

        let header_b64 = general_purpose::URL_SAFE_NO_PAD.encode(header_json.as_bytes());
        let claims_b64 = general_purpose::URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        let message = format!("{header_b64}.{claims_b64}");

        let signature: Signature = signing_key.sign(message.as_bytes());
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature.to_bytes());

        log::debug!("Minted Apple client secret for client {client_id}");
        Ok(format!("{message}.{signature_b64}"))
    }

    /// Decode the ID token payload without signature verification.
    ///
    /// The token arrives over the direct TLS channel from Apple's token
    /// endpoint; signature validation against JWKS is out of scope here.
    fn decode_id_token(id_token: &str) -> Result<AppleIdTokenClaims, AuthError> {
        let payload = id_token.split('.').nth(1).ok_or_else(|| {
            AuthError::InvalidResponse("id_token is not a JWT".to_string())
        })?;
        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::InvalidResponse(format!("id_token payload not base64: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| AuthError::InvalidResponse(format!("id_token payload not JSON: {e}")))
    }
}

#[async_trait]
impl ProviderAdapter for AppleProvider {
    fn provider_name(&self) -> &'static str {
        "apple"
    }

    fn begin_state(&self) -> FlowState {
        // A completion without state is assumed native, so web flows must
        // mark themselves
        FlowState {
            app: Some(AppVariant::Web),
            ..FlowState::default()
        }
    }

    fn completes_via_form_post(&self) -> bool {
        true
    }

    fn begin_authorization(
        &self,
        _app: AppVariant,
        state: Option<&str>,
    ) -> Result<String, AuthError> {
        let redirect_uri = self.settings.redirect_uri.clone().unwrap_or_default();

        let mut url = url::Url::parse(self.authorization_endpoint())
            .map_err(|e| AuthError::Configuration(format!("invalid authorization endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code id_token")
            .append_pair("response_mode", "form_post")
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", &self.settings.scope);

        // Generating an auth URL implies authenticating via web, which
        // always uses the service ID
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id_for(AppVariant::Web));

        if let Some(state) = state {
            url.query_pairs_mut().append_pair("state", state);
        }
        Ok(url.to_string())
    }

    async fn complete_authorization(
        &self,
        code: &str,
        app: AppVariant,
    ) -> Result<TokenIdentity, AuthError> {
        let client_id = self.client_id_for(app);
        let client_secret = self.client_secret(&client_id)?;
        let redirect_uri = self.settings.redirect_uri.clone().unwrap_or_default();

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &client_id);
        params.insert("client_secret", &client_secret);
        params.insert("redirect_uri", &redirect_uri);

        log::debug!("Exchanging authorization code with Apple token endpoint as {client_id}");
        let response = self
            .http_client
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("token exchange failed: {e}")))?;

        let status = response.status();
        let token_response: AppleTokenResponse = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("failed to parse token response: {e}"))
        })?;

        if let Some(error) = token_response.error {
            return Err(AuthError::InvalidGrant(error));
        }
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "token endpoint replied with status {status}"
            )));
        }
        let id_token = token_response.id_token.ok_or_else(|| {
            AuthError::InvalidResponse("token response missing id_token".to_string())
        })?;

        let claims = Self::decode_id_token(&id_token)?;
        let email = claims
            .email
            .ok_or_else(|| AuthError::InvalidResponse("id_token missing email".to_string()))?;
        let auth_id = claims
            .aud
            .ok_or_else(|| AuthError::InvalidResponse("id_token missing audience".to_string()))?;

        Ok(TokenIdentity {
            auth_id,
            email,
            names: NameMap::new(),
        })
    }

    fn inline_names(&self, callback: &CallbackPayload) -> NameMap {
        apple_inline_names(callback.user.as_deref())
    }
}
