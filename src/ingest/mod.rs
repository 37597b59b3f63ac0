// src/ingest/mod.rs
pub mod config;
pub mod unpack;

use metrics::counter;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::metrics as m;
use crate::store::{MediaName, MediaStore, Visibility};
use crate::upstream::{Session, StoryClient, StoryItem};
use unpack::Stored;

pub fn is_whitelisted<S: AsRef<str>>(account: S, whitelist: &[String]) -> bool {
    let a = account.as_ref();
    whitelist.iter().any(|w| w == a)
}

/// Empty whitelist publishes everything; otherwise only listed accounts.
pub fn is_publishable<S: AsRef<str>>(account: S, whitelist: &[String]) -> bool {
    whitelist.is_empty() || is_whitelisted(account, whitelist)
}

pub fn visibility_for(account: &str, whitelist: &[String]) -> Visibility {
    if is_publishable(account, whitelist) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

/// Outcome counts of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub listed: usize,
    pub saved: usize,
    pub skipped_existing: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub unpacked: usize,
    /// Stopped early on an overload or auth signal.
    pub aborted: bool,
    /// The upstream rejected the session; the caller must not carry on with it.
    pub auth_rejected: bool,
}

enum ItemOutcome {
    Saved(Stored),
    Existing,
    Unavailable,
    Failed,
    Abort,
    Rejected,
}

/// Pull the story list and download everything not yet in the store.
///
/// Only a failure to list stories is returned; per-item problems are logged
/// and counted so one bad item never aborts the batch.
pub async fn run_once(
    client: &dyn StoryClient,
    session: &Session,
    store: &MediaStore,
    whitelist: &[String],
    fetch_timeout: Duration,
) -> Result<IngestReport, UpstreamError> {
    m::ensure_described();

    let stories = client.list_stories(session).await?;
    let mut report = IngestReport {
        listed: stories.len(),
        ..Default::default()
    };

    for item in &stories {
        match ingest_item(client, session, store, whitelist, fetch_timeout, item).await {
            ItemOutcome::Saved(stored) => {
                report.saved += 1;
                counter!(m::SAVED).increment(1);
                if matches!(stored, Stored::Unpacked { .. }) {
                    report.unpacked += 1;
                    counter!(m::UNPACKED).increment(1);
                }
            }
            ItemOutcome::Existing => {
                report.skipped_existing += 1;
                counter!(m::SKIPPED_EXISTING).increment(1);
            }
            ItemOutcome::Unavailable => {
                report.unavailable += 1;
                counter!(m::UNAVAILABLE).increment(1);
            }
            ItemOutcome::Failed => {
                report.failed += 1;
                counter!(m::FETCH_ERRORS).increment(1);
            }
            ItemOutcome::Abort => {
                report.aborted = true;
                counter!(m::OVERLOAD_ABORTS).increment(1);
                break;
            }
            ItemOutcome::Rejected => {
                report.aborted = true;
                report.auth_rejected = true;
                counter!(m::AUTH_REJECTIONS).increment(1);
                break;
            }
        }
    }

    tracing::info!(
        target: "ingest",
        client = client.name(),
        listed = report.listed,
        saved = report.saved,
        existing = report.skipped_existing,
        unavailable = report.unavailable,
        failed = report.failed,
        aborted = report.aborted,
        auth_rejected = report.auth_rejected,
        "ingest pass finished"
    );
    Ok(report)
}

async fn ingest_item(
    client: &dyn StoryClient,
    session: &Session,
    store: &MediaStore,
    whitelist: &[String],
    fetch_timeout: Duration,
    item: &StoryItem,
) -> ItemOutcome {
    let name = match MediaName::for_story(item) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(id = %item.id, error = %e, "skipping story with unusable id");
            return ItemOutcome::Failed;
        }
    };

    if store.contains(&name).await {
        return ItemOutcome::Existing;
    }

    let bytes = match tokio::time::timeout(fetch_timeout, client.fetch_blob(session, &item.media))
        .await
    {
        Err(_) => {
            tracing::warn!(file = name.file_name(), timeout = ?fetch_timeout, "media fetch timed out");
            return ItemOutcome::Failed;
        }
        Ok(Err(e)) if e.is_auth() => {
            tracing::error!(file = name.file_name(), error = %e, "session rejected, aborting ingest");
            return ItemOutcome::Rejected;
        }
        Ok(Err(e)) if e.is_overload() => {
            tracing::warn!(file = name.file_name(), error = %e, "aborting ingest until next tick");
            return ItemOutcome::Abort;
        }
        Ok(Err(e)) => {
            tracing::warn!(file = name.file_name(), error = %e, "media fetch failed");
            return ItemOutcome::Failed;
        }
        Ok(Ok(None)) => {
            tracing::debug!(file = name.file_name(), "media not available yet");
            return ItemOutcome::Unavailable;
        }
        Ok(Ok(Some(bytes))) => bytes,
    };

    let visibility = visibility_for(name.account(), whitelist);
    match unpack::store_blob(store, &name, &bytes, visibility).await {
        Ok(stored) => {
            tracing::info!(
                account = name.account(),
                file = name.file_name(),
                public = visibility == Visibility::Public,
                "saved"
            );
            ItemOutcome::Saved(stored)
        }
        Err(e) => {
            tracing::error!(file = name.file_name(), error = %e, "could not store media");
            ItemOutcome::Failed
        }
    }
}
