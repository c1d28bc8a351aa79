use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::middleware::{metrics_middleware, SessionAuthority};
use amora_shared::types::auth::Claims;

pub mod clock;
pub mod config;
pub mod disposable;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod services;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

use clock::Clock;
use config::AppConfig;
use mailer::Mailer;
use repository::Repository;
use routes::health::HealthProbe;
use services::otp_service::OtpSettings;
use services::{
    AuthService, FeedService, OnboardingService, OtpService, PaymentService, QuotaService, SwipeService,
    TokenService,
};
use session::{session_key, SessionStore};
use storage::PhotoStore;

/// Upper bound for a whole multipart photo request.
const PHOTO_BODY_LIMIT: usize = 30 * 1024 * 1024;

/// External capabilities the services are built on.
pub struct Ports {
    pub repo: Arc<dyn Repository>,
    pub sessions: Arc<dyn SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub photos: Arc<dyn PhotoStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthService,
    pub onboarding: OnboardingService,
    pub feeds: FeedService,
    pub swipes: SwipeService,
    pub payments: PaymentService,
    pub sessions: Arc<dyn SessionStore>,
    pub probes: Vec<Arc<dyn HealthProbe>>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        ports: Ports,
        probes: Vec<Arc<dyn HealthProbe>>,
        metrics_handle: PrometheusHandle,
    ) -> AppResult<Self> {
        let Ports { repo, sessions, mailer, photos, clock } = ports;

        let tokens = TokenService::from_config(&config)?;
        let otp = OtpService::new(repo.clone(), mailer, clock.clone(), OtpSettings::from(&config));
        let quota = QuotaService::new(repo.clone(), clock.clone());

        Ok(Self {
            auth: AuthService::new(
                repo.clone(),
                otp,
                quota.clone(),
                tokens,
                sessions.clone(),
                clock.clone(),
                config.allowed_disposable_email,
            ),
            onboarding: OnboardingService::new(repo.clone(), photos, clock.clone()),
            feeds: FeedService::new(repo.clone(), clock.clone()),
            swipes: SwipeService::new(repo.clone(), quota, clock.clone()),
            payments: PaymentService::new(repo, clock),
            sessions,
            probes,
            metrics_handle,
            config,
        })
    }
}

#[async_trait::async_trait]
impl SessionAuthority for AppState {
    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        self.auth.tokens().verify(token)
    }

    async fn has_session(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.sessions.get(&session_key(user_id)).await?.is_some())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/auth/otp/resend", post(routes::auth::resend_otp))
        .route("/auth/otp", post(routes::auth::login_or_register))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::show_profile))
        .route("/on-boarding/personal-info", post(routes::onboarding::update_personal_info))
        .route(
            "/on-boarding/photos",
            post(routes::onboarding::update_photos).layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT)),
        )
        .route("/on-boarding/hobby-and-interest", post(routes::onboarding::update_hobby_and_interest))
        .route("/on-boarding/location", post(routes::onboarding::update_location))
        .route("/feeds", get(routes::feeds::show_feeds).post(routes::feeds::swipe))
        .route("/payment", post(routes::payment::create_payment))
        .route_layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
