//! Command orchestration. Library errors are wrapped with `anyhow` context
//! here; `main` only logs and exits.

pub mod convert;
pub mod import;
pub mod inspect;

use anyhow::Context;
use tracing::info;

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    db::{self, IntrospectOptions},
    schema::Schema,
};

pub async fn dispatch(cli: Cli, cfg: &AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Import(args) => import::run(args, cfg).await,
        Commands::Convert(args) => convert::run(args, cfg),
        Commands::Inspect(args) => inspect::run(args, cfg).await,
    }
}

/// Connects using config plus command-line overrides and reads the catalog.
async fn introspect_database(
    cfg: &AppConfig,
    database_url: Option<&str>,
    schema: Option<String>,
) -> anyhow::Result<Schema> {
    let mut database = cfg.database_with_url(database_url).context(
        "no database configured; pass --database-url or set SCAFFOLD_DATABASE__URL",
    )?;
    if let Some(schema) = schema {
        database.schema = schema;
    }

    let connected = db::connect(&database).await?;
    let options = IntrospectOptions {
        schema: database.schema.clone(),
    };
    let schema = connected
        .provider
        .introspect(&connected.db, &options)
        .await
        .context("failed to read database catalog")?;
    info!(
        backend = schema.backend.as_str(),
        tables = schema.tables.len(),
        "introspected schema"
    );
    Ok(schema)
}
