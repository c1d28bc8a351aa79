use std::sync::Arc;

use amora_shared::clients::db::create_pool;
use amora_shared::clients::email::EmailClient;
use amora_shared::clients::minio::{MinioClient, MinioSettings};
use amora_shared::clients::redis::RedisClient;

use amora_user::clock::SystemClock;
use amora_user::config::AppConfig;
use amora_user::repository::PgRepository;
use amora_user::routes::health::HealthProbe;
use amora_user::{router, AppState, Ports};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    amora_shared::middleware::init_tracing("amora-user");

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = create_pool(&config.database_url, config.database_pool_size)?;
    let repo = Arc::new(PgRepository::new(pool));

    let redis = Arc::new(RedisClient::connect(&config.redis_url).await?);
    tracing::info!(url = %config.redis_url, "connected to Redis");

    let email = Arc::new(EmailClient::new(&config.resend_api_key, &config.from_email, &config.from_name));
    let minio = Arc::new(
        MinioClient::new(MinioSettings {
            endpoint: &config.minio_endpoint,
            access_key: &config.minio_access_key,
            secret_key: &config.minio_secret_key,
            bucket: &config.minio_bucket,
            public_url: &config.minio_public_url,
        })
        .await,
    );

    let metrics_handle = amora_shared::middleware::init_metrics("amora-user")?;

    let ports = Ports {
        repo: repo.clone(),
        sessions: redis.clone(),
        mailer: email,
        photos: minio,
        clock: Arc::new(SystemClock),
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![repo as Arc<dyn HealthProbe>, redis];
    let state = Arc::new(AppState::build(config, ports, probes, metrics_handle)?);

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-user starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
