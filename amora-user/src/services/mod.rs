pub mod auth_service;
pub mod feed_service;
pub mod onboarding_service;
pub mod otp_service;
pub mod payment_service;
pub mod quota_service;
pub mod swipe_service;
pub mod token_service;

pub use auth_service::AuthService;
pub use feed_service::FeedService;
pub use onboarding_service::OnboardingService;
pub use otp_service::OtpService;
pub use payment_service::PaymentService;
pub use quota_service::QuotaService;
pub use swipe_service::SwipeService;
pub use token_service::TokenService;
