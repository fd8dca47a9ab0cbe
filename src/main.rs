use clap::Parser;

use entity_scaffold::{
    cli::Cli,
    commands,
    config::{AppConfig, defaults::DEFAULT_RUST_LOG},
    logging::init_tracing,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("scaffold failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::from_env();
    // Subscriber first so config errors are reported too.
    init_tracing(
        cfg.as_ref()
            .map(|cfg| cfg.logging.rust_log.as_str())
            .unwrap_or(DEFAULT_RUST_LOG),
    );
    let cfg = cfg?;

    commands::dispatch(cli, &cfg).await
}
