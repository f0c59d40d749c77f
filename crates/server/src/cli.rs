//! CLI argument parsing and subcommand dispatch.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use loadcalc_compute::{ComputationOutcome, WorkerPool};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::router;
use crate::state::AppState;

/// loadcalc: offloaded synthetic compute for load testing.
#[derive(Parser, Debug)]
#[command(name = "loadcalc-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve {
        /// Override the bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run computations locally without HTTP and print each outcome.
    Run {
        /// Complexity value, passed through the same validation as the query parameter.
        #[arg(long)]
        complexity: Option<String>,
        /// Number of concurrent computations.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

pub async fn dispatch(cli: Cli, mut config: loadcalc_core::Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Run { complexity, count } => run_local(config, complexity, count).await,
    }
}

async fn serve(config: loadcalc_core::Config) -> anyhow::Result<()> {
    config.log_summary();
    let addr = config.server.bind_addr();
    let state = AppState::build(config, Handle::current());
    let app = router::build_router(state.clone());

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let pool = state.pool.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, draining requests");
            pool.shutdown();
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn run_local(
    config: loadcalc_core::Config,
    complexity: Option<String>,
    count: usize,
) -> anyhow::Result<()> {
    let state = AppState::build(config, Handle::current());
    let mut set = JoinSet::new();
    for _ in 0..count.max(1) {
        let state = Arc::clone(&state);
        let raw = complexity.clone();
        set.spawn(async move { state.handler.compute(raw.as_deref()).await });
    }

    let mut failures = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined? {
            ComputationOutcome::Success(r) => println!(
                "OK complexity={} size={} pause={}ms elapsed={}ms",
                r.complexity,
                r.buffer_len,
                r.pause.as_millis(),
                r.elapsed.as_millis()
            ),
            outcome => {
                failures += 1;
                println!("{}", outcome.body());
            }
        }
    }

    let snap = state.metrics.snapshot();
    println!(
        "{} = {}, {} mean = {:.1}ms",
        snap.events.name,
        snap.events.value,
        snap.timer.name,
        snap.timer.mean_ms.unwrap_or(0.0)
    );

    if failures > 0 {
        anyhow::bail!("{} of {} computations failed", failures, count.max(1));
    }
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl_c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["loadcalc-server"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::parse_from(["loadcalc-server", "run", "--complexity", "20", "--count", "4"]);
        match cli.command {
            Some(Command::Run { complexity, count }) => {
                assert_eq!(complexity.as_deref(), Some("20"));
                assert_eq!(count, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_reports_failures_as_error() {
        let config = loadcalc_core::Config {
            profile: String::new(),
            server: loadcalc_core::ServerConfig { host: "127.0.0.1".into(), port: 0 },
            compute: loadcalc_core::ComputeConfig::default(),
        };
        let err = run_local(config, Some("0".into()), 2).await.unwrap_err();
        assert_eq!(err.to_string(), "2 of 2 computations failed");
    }
}
