pub mod auth;
pub mod feeds;
pub mod health;
pub mod onboarding;
pub mod payment;
