use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub supabase: SupabaseSettings,
    pub stripe: StripeSettings,
    pub openai: OpenAiSettings,
    pub email: EmailSettings,
    pub app: AppSettings,
    #[serde(default)]
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Hosted auth + object storage platform
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_role_key: String,
    /// Secret used to verify user access tokens issued by the hosted auth service
    pub jwt_secret: String,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: String,
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    /// Empty key puts the email client in no-op mode (logs instead of sending)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_email_api_base")]
    pub api_base: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_support_inbox")]
    pub support_inbox: String,
}

/// Public-facing URLs used for redirects and links in emails
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub public_url: String,
    #[serde(default = "default_post_login_path")]
    pub post_login_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_leads_per_ip_per_hour")]
    pub leads_per_ip_per_hour: i64,
    #[serde(default = "default_downloads_per_hour")]
    pub downloads_per_hour: i64,
    #[serde(default = "default_tests_per_day")]
    pub tests_per_day: i64,
    #[serde(default = "default_max_samples")]
    pub max_samples: i64,
    #[serde(default = "default_min_total_words")]
    pub min_total_words: i64,
    #[serde(default = "default_download_token_ttl_hours")]
    pub download_token_ttl_hours: i64,
    #[serde(default = "default_download_token_max_uses")]
    pub download_token_max_uses: i32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            leads_per_ip_per_hour: default_leads_per_ip_per_hour(),
            downloads_per_hour: default_downloads_per_hour(),
            tests_per_day: default_tests_per_day(),
            max_samples: default_max_samples(),
            min_total_words: default_min_total_words(),
            download_token_ttl_hours: default_download_token_ttl_hours(),
            download_token_max_uses: default_download_token_max_uses(),
        }
    }
}

fn default_storage_bucket() -> String { "voice-artifacts".to_string() }
fn default_stripe_api_base() -> String { "https://api.stripe.com".to_string() }
fn default_openai_api_base() -> String { "https://api.openai.com".to_string() }
fn default_chat_model() -> String { "gpt-4o".to_string() }
fn default_transcription_model() -> String { "whisper-1".to_string() }
fn default_email_api_base() -> String { "https://api.resend.com".to_string() }
fn default_from_address() -> String { "VoiceDNA <hello@voicedna.app>".to_string() }
fn default_support_inbox() -> String { "support@voicedna.app".to_string() }
fn default_post_login_path() -> String { "/studio".to_string() }

fn default_leads_per_ip_per_hour() -> i64 { 5 }
fn default_downloads_per_hour() -> i64 { 20 }
fn default_tests_per_day() -> i64 { 25 }
fn default_max_samples() -> i64 { 10 }
fn default_min_total_words() -> i64 { 300 }
fn default_download_token_ttl_hours() -> i64 { 72 }
fn default_download_token_max_uses() -> i32 { 5 }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with VOICEDNA__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with VOICEDNA__)
            // e.g., VOICEDNA__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("VOICEDNA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Apply well-known environment variable names on top
        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("VOICEDNA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional environment variable names the hosting platform exposes
/// (DATABASE_URL, SUPABASE_URL, STRIPE_SECRET_KEY, ...) over the file-based config.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(url) = env::var("SUPABASE_URL") {
        builder = builder.set_override("supabase.url", url)?;
    }
    if let Ok(key) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
        builder = builder.set_override("supabase.service_role_key", key)?;
    }
    if let Ok(secret) = env::var("SUPABASE_JWT_SECRET") {
        builder = builder.set_override("supabase.jwt_secret", secret)?;
    }
    if let Ok(key) = env::var("STRIPE_SECRET_KEY") {
        builder = builder.set_override("stripe.secret_key", key)?;
    }
    if let Ok(secret) = env::var("STRIPE_WEBHOOK_SECRET") {
        builder = builder.set_override("stripe.webhook_secret", secret)?;
    }
    if let Ok(key) = env::var("OPENAI_API_KEY") {
        builder = builder.set_override("openai.api_key", key)?;
    }
    if let Ok(key) = env::var("RESEND_API_KEY") {
        builder = builder.set_override("email.api_key", key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = LimitSettings::default();
        assert_eq!(limits.leads_per_ip_per_hour, 5);
        assert_eq!(limits.downloads_per_hour, 20);
        assert_eq!(limits.tests_per_day, 25);
        assert_eq!(limits.min_total_words, 300);
        assert_eq!(limits.download_token_ttl_hours, 72);
    }

    #[test]
    fn test_default_endpoints() {
        assert_eq!(default_stripe_api_base(), "https://api.stripe.com");
        assert_eq!(default_openai_api_base(), "https://api.openai.com");
        assert_eq!(default_transcription_model(), "whisper-1");
    }
}
