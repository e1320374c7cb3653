use crate::auth::dto::JwtKeys;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::{AppConfig, StoreBackend};
use crate::memory::MemoryStore;
use crate::rate_limit::IpRateLimiter;
use crate::reviews::repo::{PgReviewStore, ReviewStore};
use anyhow::Context;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

/// Process-wide state, built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub keys: Arc<JwtKeys>,
    pub users: Arc<dyn UserStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub limiter: Arc<IpRateLimiter>,
    /// Present only for the Postgres backend; used for migrations.
    pub db: Option<PgPool>,
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        match config.store {
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Self::in_memory(config)
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .clone()
                    .context("DATABASE_URL is required for the postgres store")?;
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(&url)
                    .await
                    .context("connect to database")?;
                let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                let reviews = Arc::new(PgReviewStore::new(db.clone())) as Arc<dyn ReviewStore>;
                let mut state = Self::from_parts(config, users, reviews)?;
                state.db = Some(db);
                Ok(state)
            }
        }
    }

    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(
            config,
            store.clone() as Arc<dyn UserStore>,
            store as Arc<dyn ReviewStore>,
        )
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        reviews: Arc<dyn ReviewStore>,
    ) -> anyhow::Result<Self> {
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        let limiter = Arc::new(IpRateLimiter::new(&config.rate_limit)?);
        Ok(Self {
            keys,
            users,
            reviews,
            limiter,
            db: None,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(AppConfig::for_tests()).expect("test config is valid")
    }
}
