// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Affiliate, AffiliateStatus, CreditStatus, DiscountCode, DownloadToken, Lead, MessageSender,
    Profile, Purchase, PurchaseStatus, QuestionnaireResponse, ReferralCode, ReferralCredit,
    Sample, SampleKind, Subscription, SupportMessage, SupportTicket, VoiceProfile,
};
pub use requests::{
    AffiliateApplyRequest, AuthCallbackQuery, CheckoutRequest, CreateSampleRequest,
    CreateTicketRequest, LeadRequest, QuestionnaireRequest, TestVoiceRequest,
    TicketMessageRequest, UpdateProfileRequest, ValidateCodeQuery,
};
pub use responses::{
    AffiliateSummaryResponse, CheckoutResponse, CodeValidationResponse, DeployResponse,
    ErrorResponse, FunnelStatusResponse, HealthResponse, LeadResponse, ReferralSummaryResponse,
    TestVoiceResponse, TicketDetailResponse,
};
