pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::evaluation_service::EvaluationService;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub evaluation_service: EvaluationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self::with_timeout(pool, Duration::from_secs(config.evaluation_timeout_secs))
    }

    /// Builds state without touching the global config; used by tests and
    /// embedders that supply their own settings.
    pub fn with_timeout(pool: PgPool, evaluation_timeout: Duration) -> Self {
        let evaluation_service = EvaluationService::new(pool.clone(), evaluation_timeout);
        Self {
            pool,
            evaluation_service,
        }
    }
}
