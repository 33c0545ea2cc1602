#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use doorman::{
    handlers::{apple_auth, google_auth, health},
    providers::{AppleProvider, GoogleProvider},
    settings::DoormanSettings,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads the .env file and initializes the logger
    let settings = DoormanSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // Adapter construction is the only place configuration errors surface:
    // fatal at startup, not per-request
    let google = settings
        .google
        .clone()
        .map(GoogleProvider::new)
        .transpose()
        .map_err(|e| std::io::Error::other(format!("Failed to initialize Google provider: {e}")))?
        .map(web::Data::new);
    let apple = settings
        .apple
        .clone()
        .map(AppleProvider::new)
        .transpose()
        .map_err(|e| std::io::Error::other(format!("Failed to initialize Apple provider: {e}")))?
        .map(web::Data::new);

    if google.is_none() && apple.is_none() {
        return Err(std::io::Error::other(
            "No sign-in providers are configured. Configure [google] or [apple] in Settings.toml.",
        ));
    }

    start_server(settings, google, apple).await
}

/// Start the HTTP server with the configured provider routes
///
/// # Errors
///
/// Returns an error if binding to the configured address fails.
async fn start_server(
    settings: DoormanSettings,
    google: Option<web::Data<GoogleProvider>>,
    apple: Option<web::Data<AppleProvider>>,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    log::info!("Starting doorman {} on {bind_address}", doorman::VERSION);

    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .route("/auth/health", web::get().to(health));

        if let Some(google) = &google {
            app = app.app_data(google.clone()).service(
                // All methods route to the handler; dispatch happens inside
                web::resource("/auth/google").route(web::route().to(google_auth)),
            );
        }
        if let Some(apple) = &apple {
            app = app
                .app_data(apple.clone())
                .service(web::resource("/auth/apple").route(web::route().to(apple_auth)));
        }
        app
    })
    .bind(&bind_address)?
    .run()
    .await
}
