use actix_cors::Cors;
use actix_web::{error, middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error as log_error, info};

use voicedna_api::auth::JwtVerifier;
use voicedna_api::config::Settings;
use voicedna_api::error::ApiError;
use voicedna_api::routes::{self, AppState};
use voicedna_api::services::{
    EmailClient, OpenAiClient, PostgresClient, StripeClient, SupabaseClient,
};

/// Handle JSON payload errors
fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::Validation(format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid query: {}", err)).into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting VoiceDNA API service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        log_error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize PostgreSQL client (runs migrations)
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let postgres = Arc::new(
        PostgresClient::from_settings(&settings.database.url, Some(db_max_conn), Some(db_min_conn))
            .await
            .unwrap_or_else(|e| {
                log_error!("Failed to connect to PostgreSQL: {}", e);
                panic!("PostgreSQL connection error: {}", e);
            }),
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    // Initialize platform client (auth code exchange + object storage)
    let supabase = Arc::new(SupabaseClient::new(
        settings.supabase.url.clone(),
        settings.supabase.service_role_key.clone(),
        settings.supabase.storage_bucket.clone(),
    ));

    info!("Platform client initialized (bucket: {})", settings.supabase.storage_bucket);

    // Initialize payment provider client
    let stripe = Arc::new(StripeClient::new(
        settings.stripe.api_base.clone(),
        settings.stripe.secret_key.clone(),
    ));

    // Initialize language-model client
    let openai = Arc::new(OpenAiClient::new(
        settings.openai.api_base.clone(),
        settings.openai.api_key.clone(),
        settings.openai.chat_model.clone(),
        settings.openai.transcription_model.clone(),
        settings.openai.request_timeout_secs.unwrap_or(120),
    ));

    info!("LLM client initialized (chat: {})", settings.openai.chat_model);

    // Initialize email client (no-op mode without an API key)
    let email = Arc::new(EmailClient::new(
        settings.email.api_base.clone(),
        settings.email.api_key.clone(),
        settings.email.from_address.clone(),
        settings.email.support_inbox.clone(),
    ));

    // Initialize JWT verifier for hosted-auth access tokens
    let auth = Arc::new(JwtVerifier::new(&settings.supabase.jwt_secret));

    // Build application state
    let app_state = AppState {
        postgres,
        supabase,
        stripe,
        openai,
        email,
        auth,
        settings: Arc::new(settings.clone()),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
