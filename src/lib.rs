pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use services::artifact::{ArtifactGenerator, QrPayloadEncoder};
use services::audit::AuditLog;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
    pub audit: AuditLog,
    pub artifacts: Arc<dyn ArtifactGenerator>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let audit = AuditLog::new(db.pool.clone());

        Ok(Arc::new(Self {
            db,
            config,
            audit,
            artifacts: Arc::new(QrPayloadEncoder),
        }))
    }
}
