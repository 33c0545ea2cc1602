//! Google adapter
//!
//! Completion is delivered as a `code` query parameter on the redirect back
//! to the app. After the token exchange, the token-info lookup (email and
//! audience) and the People API names lookup run in parallel; both must
//! succeed before the identity is assembled.

use crate::errors::AuthError;
use crate::identity::{google_names, AppVariant, NameMap};
use crate::providers::{ProviderAdapter, TokenIdentity};
use crate::settings::GoogleSettings;
use crate::state::FlowState;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const GOOGLE_PEOPLE_URL: &str = "https://people.googleapis.com/v1/people/me";

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    email: Option<String>,
    aud: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GooglePeopleResponse {
    #[serde(default)]
    names: Vec<serde_json::Value>,
}

/// Google OAuth2 client adapter
#[derive(Debug)]
pub struct GoogleProvider {
    settings: GoogleSettings,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    /// Create an adapter from settings.
    ///
    /// Configuration problems are fatal here, at startup, rather than
    /// per-request: the begin path must have no failure surface.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the client id, client secret,
    /// or redirect URI is missing.
    pub fn new(settings: GoogleSettings) -> Result<Self, AuthError> {
        settings.get_client_id().ok_or_else(|| {
            AuthError::Configuration("client_id not configured for Google provider".to_string())
        })?;
        settings.get_client_secret().ok_or_else(|| {
            AuthError::Configuration("client_secret not configured for Google provider".to_string())
        })?;
        settings.redirect_uri.as_ref().ok_or_else(|| {
            AuthError::Configuration("redirect_uri not configured for Google provider".to_string())
        })?;
        Ok(Self {
            settings,
            http_client: reqwest::Client::new(),
        })
    }

    fn authorization_endpoint(&self) -> &str {
        self.settings
            .authorization_endpoint
            .as_deref()
            .unwrap_or(GOOGLE_AUTHORIZE_URL)
    }

    fn token_endpoint(&self) -> &str {
        self.settings
            .token_endpoint
            .as_deref()
            .unwrap_or(GOOGLE_TOKEN_URL)
    }

    fn tokeninfo_endpoint(&self) -> &str {
        self.settings
            .tokeninfo_endpoint
            .as_deref()
            .unwrap_or(GOOGLE_TOKENINFO_URL)
    }

    fn userinfo_endpoint(&self) -> &str {
        self.settings
            .userinfo_endpoint
            .as_deref()
            .unwrap_or(GOOGLE_PEOPLE_URL)
    }

    /// Exchange the authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let client_id = self.settings.get_client_id().unwrap_or_default();
        let client_secret = self.settings.get_client_secret().unwrap_or_default();
        let redirect_uri = self.settings.redirect_uri.clone().unwrap_or_default();

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &client_id);
        params.insert("client_secret", &client_secret);
        params.insert("redirect_uri", &redirect_uri);

        log::debug!("Exchanging authorization code with Google token endpoint");
        let response = self
            .http_client
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("token exchange failed: {e}")))?;

        let status = response.status();
        let token_response: GoogleTokenResponse = response.json().await.map_err(|e| {
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
        token_response
            .access_token
            .ok_or_else(|| AuthError::InvalidResponse("token response missing access_token".to_string()))
    }

    /// Resolve email and audience from the token-info endpoint
    async fn resolve_token_info(&self, access_token: &str) -> Result<(String, String), AuthError> {
        let response = self
            .http_client
            .get(self.tokeninfo_endpoint())
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("token-info lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "token-info endpoint replied with status {}",
                response.status()
            )));
        }
        let info: GoogleTokenInfo = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("failed to parse token-info response: {e}"))
        })?;

        let email = info
            .email
            .ok_or_else(|| AuthError::InvalidResponse("token info missing email".to_string()))?;
        let aud = info
            .aud
            .ok_or_else(|| AuthError::InvalidResponse("token info missing audience".to_string()))?;
        Ok((email, aud))
    }

    /// Resolve name parts from the People API
    async fn resolve_names(&self, access_token: &str) -> Result<NameMap, AuthError> {
        let response = self
            .http_client
            .get(self.userinfo_endpoint())
            .query(&[("personFields", "names")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("profile lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "profile endpoint replied with status {}",
                response.status()
            )));
        }
        let people: GooglePeopleResponse = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("failed to parse profile response: {e}"))
        })?;

        Ok(google_names(&people.names))
    }
}

#[async_trait]
impl ProviderAdapter for GoogleProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn begin_state(&self) -> FlowState {
        // Single client registration: nothing to carry unless the caller
        // supplies a return URL
        FlowState::default()
    }

    fn completes_via_form_post(&self) -> bool {
        false
    }

    fn begin_authorization(
        &self,
        _app: AppVariant,
        state: Option<&str>,
    ) -> Result<String, AuthError> {
        let client_id = self.settings.get_client_id().unwrap_or_default();
        let redirect_uri = self.settings.redirect_uri.clone().unwrap_or_default();

        let mut url = url::Url::parse(self.authorization_endpoint())
            .map_err(|e| AuthError::Configuration(format!("invalid authorization endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("access_type", "offline")
            .append_pair("scope", &self.settings.scope)
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri);
        if let Some(state) = state {
            url.query_pairs_mut().append_pair("state", state);
        }
        Ok(url.to_string())
    }

    async fn complete_authorization(
        &self,
        code: &str,
        _app: AppVariant,
    ) -> Result<TokenIdentity, AuthError> {
        let access_token = self.exchange_code(code).await?;

        // The email lookup and the names lookup have no ordering dependency
        // once the credential is obtained
        let ((email, aud), names) = tokio::try_join!(
            self.resolve_token_info(&access_token),
            self.resolve_names(&access_token)
        )?;

        Ok(TokenIdentity {
            auth_id: aud,
            email,
            names,
        })
    }
}
