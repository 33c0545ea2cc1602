//! HTTP handlers translating flow outcomes to transport responses
//!
//! The flow itself returns an explicit `Result`; these handlers own the
//! translation to actix responses: a begin outcome becomes a 302 to the
//! provider, a completed identity is attached to the request extensions for
//! downstream continuations and echoed as JSON, and classified errors
//! collapse to their transport status with an opaque message. Internal
//! failure detail is logged here, never returned.

use crate::flow::{handle_flow, FlowOutcome, FlowRequest};
use crate::providers::{AppleProvider, CallbackPayload, GoogleProvider, ProviderAdapter};
use actix_web::http::header;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Query parameters recognized on the sign-in routes.
///
/// `return` is only meaningful on the begin path; the callback fields only
/// on a redirect-style completion.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    #[serde(rename = "return")]
    pub return_url: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub user: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Google sign-in route: begins on plain GET, completes on GET with a code
pub async fn google_auth(
    req: HttpRequest,
    query: web::Query<AuthQuery>,
    adapter: web::Data<GoogleProvider>,
) -> HttpResponse {
    run_flow(adapter.get_ref(), &req, query.into_inner(), None).await
}

/// Apple sign-in route: begins on GET, completes on form POST
pub async fn apple_auth(
    req: HttpRequest,
    query: web::Query<AuthQuery>,
    form: Option<web::Form<CallbackPayload>>,
    adapter: web::Data<AppleProvider>,
) -> HttpResponse {
    run_flow(
        adapter.get_ref(),
        &req,
        query.into_inner(),
        form.map(web::Form::into_inner),
    )
    .await
}

/// Health check endpoint
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        message: "Doorman is running".to_string(),
    })
}

async fn run_flow(
    adapter: &dyn ProviderAdapter,
    req: &HttpRequest,
    query: AuthQuery,
    form: Option<CallbackPayload>,
) -> HttpResponse {
    let flow_request = build_flow_request(req, query, form);
    debug!(
        "{} flow request via {}",
        adapter.provider_name(),
        flow_request.method
    );

    match handle_flow(adapter, &flow_request).await {
        Ok(FlowOutcome::Redirect(url)) => {
            debug!("Redirecting to {} authorization", adapter.provider_name());
            HttpResponse::Found()
                .append_header((header::LOCATION, url))
                .finish()
        }
        Ok(FlowOutcome::Identity(identity)) => {
            debug!(
                "{} flow completed for {}",
                adapter.provider_name(),
                identity.email
            );
            // Downstream continuations read the identity from the request
            // extensions
            req.extensions_mut().insert(identity.clone());
            HttpResponse::Ok().json(identity)
        }
        Err(err) => {
            error!("{} flow failed: {err}", adapter.provider_name());
            HttpResponse::build(err.status_code()).json(json!({
                "error": err.client_message(),
            }))
        }
    }
}

/// Assemble the framework-independent flow request from actix parts.
///
/// Callback fields prefer the form body when one was posted, falling back
/// to the redirect query.
fn build_flow_request(
    req: &HttpRequest,
    query: AuthQuery,
    form: Option<CallbackPayload>,
) -> FlowRequest {
    let referrer = req
        .headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let callback = form.unwrap_or(CallbackPayload {
        code: query.code,
        state: query.state,
        error: query.error,
        user: query.user,
    });

    FlowRequest {
        method: req.method().clone(),
        return_url: query.return_url,
        referrer,
        callback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AppleSettings, GoogleSettings};
    use crate::state::{decode_state, FlowState};
    use actix_web::body::to_bytes;
    use actix_web::http::{Method, StatusCode};
    use actix_web::test::TestRequest;
    use crate::identity::AppVariant;

    fn google_adapter() -> web::Data<GoogleProvider> {
        let settings = GoogleSettings {
            client_id: Some("google-client".to_string()),
            client_secret: Some("google-secret".to_string()),
            redirect_uri: Some("https://example.com/auth/google".to_string()),
            ..GoogleSettings::default()
        };
        web::Data::new(GoogleProvider::new(settings).unwrap())
    }

    fn apple_adapter() -> web::Data<AppleProvider> {
        let settings = AppleSettings {
            app_id: Some("com.example.app".to_string()),
            service_id: Some("com.example.web".to_string()),
            team_id: Some("TEAM123456".to_string()),
            key_id: Some("KEY1234567".to_string()),
            private_key: Some("----- fake private key -----".to_string()),
            redirect_uri: Some("https://example.com/auth/apple".to_string()),
            ..AppleSettings::default()
        };
        web::Data::new(AppleProvider::new(settings).unwrap())
    }

    fn location(response: &HttpResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[actix_web::test]
    async fn test_google_begin_redirects_without_state() {
        let req = TestRequest::get().uri("/auth/google").to_http_request();
        let response = google_auth(req, web::Query(AuthQuery::default()), google_adapter()).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let url = url::Url::parse(&location(&response)).unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "state"));
    }

    #[actix_web::test]
    async fn test_google_begin_carries_return_url_in_state() {
        let req = TestRequest::get()
            .uri("/auth/google?return=https%3A%2F%2Fexample.com%2Fafter")
            .to_http_request();
        let query = AuthQuery {
            return_url: Some("https://example.com/after".to_string()),
            ..AuthQuery::default()
        };
        let response = google_auth(req, web::Query(query), google_adapter()).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let url = url::Url::parse(&location(&response)).unwrap();
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        let state: FlowState = decode_state(Some(&token)).unwrap().unwrap();
        assert_eq!(
            state.return_url.as_deref(),
            Some("https://example.com/after")
        );
    }

    #[actix_web::test]
    async fn test_apple_begin_state_marks_web_flow() {
        let req = TestRequest::get().uri("/auth/apple").to_http_request();
        let response = apple_auth(
            req,
            web::Query(AuthQuery::default()),
            None,
            apple_adapter(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let url = url::Url::parse(&location(&response)).unwrap();
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        let state: FlowState = decode_state(Some(&token)).unwrap().unwrap();
        assert_eq!(state.app, Some(AppVariant::Web));
    }

    #[actix_web::test]
    async fn test_begin_falls_back_to_referrer_header() {
        let req = TestRequest::get()
            .uri("/auth/apple")
            .insert_header((header::REFERER, "https://referrer.example/page"))
            .to_http_request();
        let response = apple_auth(
            req,
            web::Query(AuthQuery::default()),
            None,
            apple_adapter(),
        )
        .await;

        let url = url::Url::parse(&location(&response)).unwrap();
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        let state: FlowState = decode_state(Some(&token)).unwrap().unwrap();
        assert_eq!(
            state.return_url.as_deref(),
            Some("https://referrer.example/page")
        );
    }

    #[actix_web::test]
    async fn test_unsupported_method_yields_405() {
        for method in [Method::PATCH, Method::DELETE] {
            let req = TestRequest::default()
                .method(method)
                .uri("/auth/google")
                .to_http_request();
            let response =
                google_auth(req, web::Query(AuthQuery::default()), google_adapter()).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

            let body = to_bytes(response.into_body()).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], "Method not allowed");
        }
    }

    #[actix_web::test]
    async fn test_post_to_redirect_style_provider_yields_405() {
        let req = TestRequest::post().uri("/auth/google").to_http_request();
        let response = google_auth(req, web::Query(AuthQuery::default()), google_adapter()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_malformed_state_on_completion_yields_opaque_400() {
        let req = TestRequest::post().uri("/auth/apple").to_http_request();
        let form = CallbackPayload {
            code: Some("some-code".to_string()),
            state: Some("not base64!!".to_string()),
            ..CallbackPayload::default()
        };
        let response = apple_auth(
            req,
            web::Query(AuthQuery::default()),
            Some(web::Form(form)),
            apple_adapter(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid request");
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let response = health().await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
