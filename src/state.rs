//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::events::EventPublisher;
use crate::mail::Mailer;
use crate::payment::VnPay;
use crate::security::jwt::TokenService;
use crate::storage::ImageStorage;

/// Cheaply cloneable handle to shared resources.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    db: PgPool,
    tokens: TokenService,
    mailer: Mailer,
    storage: ImageStorage,
    vnpay: VnPay,
    events: EventPublisher,
}

impl AppState {
    pub fn new(config: AppConfig, db: PgPool, mailer: Mailer, events: EventPublisher) -> Self {
        let tokens = TokenService::new(&config.jwt);
        let storage = ImageStorage::new(config.upload_dir.clone());
        let vnpay = VnPay::new(config.vnpay.clone(), config.backend_url.clone(), config.frontend_url.clone());
        Self { inner: Arc::new(AppStateInner { config, db, tokens, mailer, storage, vnpay, events }) }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig { &self.inner.config }
    #[must_use]
    pub fn db(&self) -> &PgPool { &self.inner.db }
    #[must_use]
    pub fn tokens(&self) -> &TokenService { &self.inner.tokens }
    #[must_use]
    pub fn mailer(&self) -> &Mailer { &self.inner.mailer }
    #[must_use]
    pub fn storage(&self) -> &ImageStorage { &self.inner.storage }
    #[must_use]
    pub fn vnpay(&self) -> &VnPay { &self.inner.vnpay }
    #[must_use]
    pub fn events(&self) -> &EventPublisher { &self.inner.events }
}
