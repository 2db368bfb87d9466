//! Coffee shop e-commerce backend

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coffee_shop::{
    build_router, config::AppConfig, db, events::EventPublisher, mail::Mailer, services::auth::AuthService, AppState,
};

const OTP_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = db::create_pool(&config.database_url).await.context("cannot connect to database")?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let mailer = Mailer::new(config.smtp.as_ref()).context("invalid SMTP settings")?;
    tokio::fs::create_dir_all(&config.upload_dir).await.context("cannot create upload directory")?;

    let addr = config.socket_addr();
    let admin = config.admin.clone();
    let state = AppState::new(config, pool, mailer, events);
    AuthService::new(&state).seed(admin.as_ref()).await?;
    tracing::info!(nats = state.events().is_enabled(), "Startup checks complete");

    spawn_otp_purge(state.clone());

    let app = build_router(state);
    tracing::info!("☕ Coffee shop listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Removes expired password-reset OTPs once a minute.
fn spawn_otp_purge(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(OTP_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = AuthService::new(&state).delete_expired_forgot_passwords().await {
                tracing::warn!(error = %e, "OTP purge failed");
            }
        }
    });
}
