// Service exports
pub mod openai;
pub mod postgres;
pub mod resend;
pub mod stripe;
pub mod supabase;

pub use openai::{OpenAiClient, OpenAiError};
pub use postgres::{PostgresClient, PostgresError};
pub use resend::{EmailClient, EmailError};
pub use stripe::{StripeClient, StripeError};
pub use supabase::{SupabaseClient, SupabaseError};
