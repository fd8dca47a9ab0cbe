use anyhow::Context;

use crate::{cli::InspectArgs, config::AppConfig};

pub async fn run(args: InspectArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    let schema = super::introspect_database(cfg, args.database_url.as_deref(), args.schema).await?;
    let json = serde_json::to_string_pretty(&schema).context("failed to serialize schema")?;
    println!("{json}");
    Ok(())
}
