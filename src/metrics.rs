use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const SAVED: &str = "snapfeed_saved_total";
pub const SKIPPED_EXISTING: &str = "snapfeed_skipped_existing_total";
pub const UNAVAILABLE: &str = "snapfeed_unavailable_total";
pub const FETCH_ERRORS: &str = "snapfeed_fetch_errors_total";
pub const OVERLOAD_ABORTS: &str = "snapfeed_overload_aborts_total";
pub const AUTH_REJECTIONS: &str = "snapfeed_auth_rejections_total";
pub const UNPACKED: &str = "snapfeed_unpacked_total";
pub const FEEDS_WRITTEN: &str = "snapfeed_feeds_written_total";
pub const PAGES_WRITTEN: &str = "snapfeed_archive_pages_written_total";
pub const LAST_TICK_TS: &str = "snapfeed_last_tick_ts";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(SAVED, "Media files written to the store.");
        describe_counter!(
            SKIPPED_EXISTING,
            "Stories skipped because the file already exists."
        );
        describe_counter!(
            UNAVAILABLE,
            "Stories whose media was not available yet."
        );
        describe_counter!(FETCH_ERRORS, "Per-item fetch or write failures.");
        describe_counter!(
            OVERLOAD_ABORTS,
            "Ticks whose ingestion stopped on an upstream overload."
        );
        describe_counter!(
            AUTH_REJECTIONS,
            "Ticks whose session was rejected by the upstream."
        );
        describe_counter!(UNPACKED, "Containers unpacked into playable media.");
        describe_counter!(FEEDS_WRITTEN, "RSS feeds regenerated.");
        describe_counter!(PAGES_WRITTEN, "Archive pages regenerated.");
        describe_gauge!(LAST_TICK_TS, "Unix ts when the poll loop last ticked.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must run inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
