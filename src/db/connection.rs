use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;

use super::providers::{DbProvider, default_registry, redact_url};

pub struct Connected {
    pub provider: Arc<dyn DbProvider>,
    pub db: DatabaseConnection,
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Connected> {
    let registry = default_registry()?;
    let provider = registry.provider_for_url(&cfg.url)?;

    info!(
        provider = provider.id().as_str(),
        url = %redact_url(&cfg.url),
        "connecting to database"
    );
    let db = provider
        .connect(cfg)
        .await
        .with_context(|| format!("failed to connect to {}", redact_url(&cfg.url)))?;
    provider
        .post_connect(&db, cfg)
        .await
        .context("failed to prepare database connection")?;

    Ok(Connected { provider, db })
}
