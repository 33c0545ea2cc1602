//! Test fixtures providing pre-built test objects
//!
//! Provider settings here point every endpoint override at a caller-supplied
//! base URL, so integration tests can stand up a mock server and route all
//! provider traffic to it.

use crate::providers::CallbackPayload;
use crate::settings::{AppleSettings, GoogleSettings};
use base64::{engine::general_purpose, Engine as _};

use super::constants::{
    TEST_APPLE_APP_ID, TEST_APPLE_KEY_ID, TEST_APPLE_SERVICE_ID, TEST_APPLE_TEAM_ID,
    TEST_EC_PRIVATE_KEY, TEST_GOOGLE_CLIENT_ID,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Google settings with every endpoint routed to `base_url`
    #[must_use]
    pub fn google_settings(base_url: &str) -> GoogleSettings {
        GoogleSettings {
            client_id: Some(TEST_GOOGLE_CLIENT_ID.to_string()),
            client_secret: Some("test-google-secret".to_string()),
            redirect_uri: Some("https://app.example.com/auth/google".to_string()),
            authorization_endpoint: Some(format!("{base_url}/o/oauth2/v2/auth")),
            token_endpoint: Some(format!("{base_url}/token")),
            tokeninfo_endpoint: Some(format!("{base_url}/tokeninfo")),
            userinfo_endpoint: Some(format!("{base_url}/v1/people/me")),
            ..GoogleSettings::default()
        }
    }

    /// Apple settings with every endpoint routed to `base_url`, signing with
    /// the throwaway test key
    #[must_use]
    pub fn apple_settings(base_url: &str) -> AppleSettings {
        AppleSettings {
            app_id: Some(TEST_APPLE_APP_ID.to_string()),
            service_id: Some(TEST_APPLE_SERVICE_ID.to_string()),
            team_id: Some(TEST_APPLE_TEAM_ID.to_string()),
            key_id: Some(TEST_APPLE_KEY_ID.to_string()),
            private_key: Some(TEST_EC_PRIVATE_KEY.to_string()),
            redirect_uri: Some("https://app.example.com/auth/apple".to_string()),
            authorization_endpoint: Some(format!("{base_url}/auth/authorize")),
            token_endpoint: Some(format!("{base_url}/auth/token")),
            ..AppleSettings::default()
        }
    }

    /// Apple settings pointed at the real Apple endpoints
    #[must_use]
    pub fn apple_settings_offline() -> AppleSettings {
        AppleSettings {
            app_id: Some(TEST_APPLE_APP_ID.to_string()),
            service_id: Some(TEST_APPLE_SERVICE_ID.to_string()),
            team_id: Some(TEST_APPLE_TEAM_ID.to_string()),
            key_id: Some(TEST_APPLE_KEY_ID.to_string()),
            private_key: Some(TEST_EC_PRIVATE_KEY.to_string()),
            redirect_uri: Some("https://app.example.com/auth/apple".to_string()),
            ..AppleSettings::default()
        }
    }

    /// Unsigned JWT whose payload carries the given claims, shaped like the
    /// ID tokens a token endpoint returns
    #[must_use]
    pub fn id_token_with_claims(claims: &serde_json::Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.")
    }

    /// Callback payload shaped like Apple's first-authorization form post
    #[must_use]
    pub fn apple_callback(code: &str, state: Option<&str>) -> CallbackPayload {
        CallbackPayload {
            code: Some(code.to_string()),
            state: state.map(ToString::to_string),
            error: None,
            user: Some(
                r#"{"name":{"firstName":"Test","lastName":"User"},"email":"test@example.com"}"#
                    .to_string(),
            ),
        }
    }
}
