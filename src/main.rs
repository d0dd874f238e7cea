//! Talent API proxy.
//!
//! Backend for the job seeker / recruiter frontend. Forwards opportunity
//! searches, people searches and genome lookups to the talent API.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                  TALENT PROXY                      │
//!   Client Request     │  ┌──────────┐   ┌────────────┐   ┌────────────┐   │
//!   ───────────────────┼─▶│   http   │──▶│ security   │──▶│   proxy    │   │
//!                      │  │  server  │   │ rate limit │   │ validate   │   │
//!                      │  └──────────┘   └────────────┘   └─────┬──────┘   │
//!                      │                                        ▼          │
//!   Client Response    │  ┌──────────┐   ┌────────────┐   ┌────────────┐   │      Talent
//!   ◀──────────────────┼──│  proxy   │◀──│   proxy    │◀──│  upstream  │◀──┼───── API
//!                      │  │  error   │   │ normalize  │   │   client   │   │
//!                      │  └──────────┘   └────────────┘   └────────────┘   │
//!                      │                                                   │
//!                      │   config · observability · lifecycle · admin      │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use talent_proxy::config::loader;
use talent_proxy::lifecycle::{signals, Shutdown};
use talent_proxy::observability::{logging, metrics};
use talent_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "talent-proxy")]
#[command(about = "Rate-limited proxy for the talent search and genome API", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long, env = "TALENT_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = loader::load(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("talent-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        search_url = %config.upstream.search_url,
        genome_url = %config.upstream.genome_url,
        upstream_timeout_secs = config.upstream.timeout_secs,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));
    tokio::select! {
        result = &mut server_task => {
            result??;
            tracing::warn!("HTTP server exited without a shutdown signal");
            return Ok(());
        }
        _ = signals::wait_for_signal() => shutdown.trigger(),
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
