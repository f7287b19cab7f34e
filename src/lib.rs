//! VoiceDNA API - backend service for the My Voice Twin studio
//!
//! Stateless HTTP JSON handlers in front of a hosted Postgres store, with
//! thin clients for the external SaaS boundary: payments, language model,
//! transcription, email and the hosted auth/storage platform.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{apply_percent, lookup_tier, percent_discount_cents, FunnelStage};
pub use error::ApiError;
pub use models::{Profile, Purchase, Sample, VoiceProfile};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert!(lookup_tier("essential").is_some());
        assert_eq!(apply_percent(10_000, 25), 7_500);
    }
}
