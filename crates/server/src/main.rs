mod api;
mod cli;
mod router;
mod state;

use clap::Parser;

fn load_config() -> loadcalc_core::Config {
    loadcalc_core::config::load_dotenv();
    loadcalc_core::Config::from_env()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = cli::Cli::parse();
    let config = load_config();
    config.validate()?;

    // Blocking threads host the compute jobs; size them from config.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.compute.max_blocking_threads)
        .thread_name("loadcalc")
        .build()?;

    runtime.block_on(cli::dispatch(cli, config))
}
