//! snapfeed: story gateway binary.
//! Authenticates, then polls the upstream and republishes the media store
//! as RSS feeds and a day-by-day archive until interrupted.
//!
//! Exit codes: 1 on invalid configuration (including a missing store
//! directory), rejected credentials (at startup or later in the run), or
//! after a regenerate-only run.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use snapfeed::upstream::http::HttpStoryClient;
use snapfeed::{logging, metrics, Config, Gateway, GatewaySettings, MediaStore};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            logging::init(Default::default());
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };
    logging::init(cfg.log_format);
    tracing::info!("snapfeed v{}", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = cfg.metrics_addr {
        if let Err(e) = metrics::install_exporter(addr) {
            tracing::warn!(error = %format!("{e:#}"), "metrics exporter disabled");
        }
    }

    let store = match MediaStore::open(&cfg.store_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid media store");
            return ExitCode::from(1);
        }
    };

    let client = HttpStoryClient::new(&cfg.upstream_url).with_timeout(cfg.fetch_timeout);
    let gateway = Gateway::new(Arc::new(client), store, GatewaySettings::from_config(&cfg));

    let authed = match gateway.authenticate().await {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "invalid username or password");
            return ExitCode::from(1);
        }
    };

    if cfg.regenerate_only {
        match authed.regenerate_archives(Utc::now().date_naive()).await {
            Ok(pages) => tracing::info!(pages, "archive regenerated"),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "archive regeneration failed"),
        }
        return ExitCode::from(1);
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                let _ = tx.send(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for interrupts");
                // Keep the sender alive so the loop does not read this as shutdown.
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });

    if let Err(e) = authed.run(rx).await {
        tracing::error!(error = %e, "upstream rejected the session, exiting");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
