// Route exports
pub mod auth;
pub mod checkout;
pub mod codes;
pub mod downloads;
pub mod health;
pub mod leads;
pub mod profiles;
pub mod questionnaire;
pub mod referrals;
pub mod samples;
pub mod subscriptions;
pub mod support;
pub mod voice_profiles;
pub mod webhooks;

use actix_web::web;
use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::config::Settings;
use crate::services::{EmailClient, OpenAiClient, PostgresClient, StripeClient, SupabaseClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub supabase: Arc<SupabaseClient>,
    pub stripe: Arc<StripeClient>,
    pub openai: Arc<OpenAiClient>,
    pub email: Arc<EmailClient>,
    pub auth: Arc<JwtVerifier>,
    pub settings: Arc<Settings>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(codes::configure)
            .configure(leads::configure)
            .configure(webhooks::configure)
            .configure(downloads::configure)
            .configure(profiles::configure)
            .configure(questionnaire::configure)
            .configure(samples::configure)
            .configure(checkout::configure)
            .configure(referrals::configure)
            .configure(subscriptions::configure)
            .configure(voice_profiles::configure)
            .configure(support::configure),
    );
}
