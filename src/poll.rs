// src/poll.rs
//! Two-state driver: authenticate once, then tick forever.
//!
//! A tick ingests new stories and then republishes feeds and archive pages
//! for the publish accounts. Ticks are self-contained, so a slow tick only
//! delays the next one.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::ingest::{self, IngestReport};
use crate::metrics as m;
use crate::publish::{self, archive};
use crate::store::MediaStore;
use crate::upstream::{Credentials, Session, StoryClient};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub credentials: Credentials,
    pub auth_token: Option<String>,
    pub base_url: Url,
    pub whitelist: Vec<String>,
    pub delay: Duration,
    pub fetch_timeout: Duration,
}

impl GatewaySettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            credentials: cfg.credentials.clone(),
            auth_token: cfg.auth_token.clone(),
            base_url: cfg.base_url.clone(),
            whitelist: cfg.whitelist.clone(),
            delay: cfg.delay,
            fetch_timeout: cfg.fetch_timeout,
        }
    }
}

/// Not yet logged in.
pub struct Gateway {
    client: Arc<dyn StoryClient>,
    store: MediaStore,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(client: Arc<dyn StoryClient>, store: MediaStore, settings: GatewaySettings) -> Self {
        Self {
            client,
            store,
            settings,
        }
    }

    /// Restore the configured token if any, otherwise log in with the
    /// credentials. Failure is fatal to the process.
    pub async fn authenticate(self) -> Result<Authenticated, UpstreamError> {
        let creds = &self.settings.credentials;
        let session = match self.settings.auth_token.as_deref() {
            Some(token) => self.client.restore_session(creds, token).await?,
            None => self.client.authenticate(creds).await?,
        };
        tracing::info!(user = %session.username, client = self.client.name(), "authenticated");
        Ok(Authenticated {
            client: self.client,
            store: self.store,
            settings: self.settings,
            session,
            last_day: None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// `None` when the story list could not be fetched.
    pub ingest: Option<IngestReport>,
    pub accounts: Vec<String>,
    pub pages: usize,
    pub publish_failures: usize,
    /// The upstream rejected the session during this tick.
    pub auth_rejected: bool,
}

/// Logged in; the only steady state.
pub struct Authenticated {
    client: Arc<dyn StoryClient>,
    store: MediaStore,
    settings: GatewaySettings,
    session: Session,
    last_day: Option<NaiveDate>,
}

impl Authenticated {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Today, plus every day since the previous tick's day. A rollover
    /// therefore refreshes yesterday's page once more.
    fn days_to_publish(&self, today: NaiveDate) -> Vec<NaiveDate> {
        match self.last_day {
            Some(last) if last < today => last.iter_days().take_while(|d| *d <= today).collect(),
            _ => vec![today],
        }
    }

    async fn publish_accounts(&self) -> Result<Vec<String>> {
        if !self.settings.whitelist.is_empty() {
            return Ok(self.settings.whitelist.clone());
        }
        Ok(self.store.accounts().await?.into_iter().collect())
    }

    /// Replace a rejected session with a fresh credential login. A session
    /// that came from a configured token has no password to fall back on.
    pub async fn reauthenticate(&mut self) -> Result<(), UpstreamError> {
        if self.settings.credentials.password.is_none() {
            return Err(UpstreamError::Auth(
                "session rejected and no password configured".into(),
            ));
        }
        self.session = self.client.authenticate(&self.settings.credentials).await?;
        tracing::info!(user = %self.session.username, "re-authenticated");
        Ok(())
    }

    pub async fn ingest(&self) -> Result<IngestReport, UpstreamError> {
        ingest::run_once(
            self.client.as_ref(),
            &self.session,
            &self.store,
            &self.settings.whitelist,
            self.settings.fetch_timeout,
        )
        .await
    }

    /// One full pass. Never fails: problems are logged and counted.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        match self.ingest().await {
            Ok(r) => {
                report.auth_rejected = r.auth_rejected;
                report.ingest = Some(r);
            }
            Err(e) if e.is_auth() => {
                report.auth_rejected = true;
                counter!(m::AUTH_REJECTIONS).increment(1);
                tracing::error!(error = %e, "session rejected while listing stories")
            }
            Err(e) if e.is_overload() => {
                tracing::warn!(error = %e, "upstream overloaded, retrying next tick")
            }
            Err(e) => tracing::error!(error = %e, "could not list stories"),
        }

        let today = now.date_naive();
        let days = self.days_to_publish(today);

        let accounts = match self.publish_accounts().await {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(error = %e, "could not determine publish accounts");
                return report;
            }
        };
        let snapshot = match self.store.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "could not scan media store");
                return report;
            }
        };

        for account in &accounts {
            match publish::publish_account(
                &self.store,
                &snapshot,
                account,
                &self.settings.base_url,
                &days,
            )
            .await
            {
                Ok(pages) => report.pages += pages,
                Err(e) => {
                    report.publish_failures += 1;
                    tracing::error!(account = %account, error = %format!("{e:#}"), "publish failed");
                }
            }
        }

        report.accounts = accounts;
        self.last_day = Some(today);
        gauge!(m::LAST_TICK_TS).set(now.timestamp() as f64);
        report
    }

    /// Tick, sleep, repeat until `shutdown` flips (or its sender goes away).
    ///
    /// A rejected session gets one fresh login and an immediate retry. A
    /// second rejection in a row, or a failed login, ends the loop with the
    /// auth error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), UpstreamError> {
        let mut relogged = false;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.tick(Utc::now()).await;
            tracing::debug!(?report, "tick done");

            if report.auth_rejected {
                if relogged {
                    return Err(UpstreamError::Auth(
                        "session rejected again after a fresh login".into(),
                    ));
                }
                self.reauthenticate().await?;
                relogged = true;
                continue;
            }
            relogged = false;

            tokio::select! {
                _ = tokio::time::sleep(self.settings.delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("poll loop stopped");
        Ok(())
    }

    /// Rebuild every archive page of every publish account up to `today`.
    pub async fn regenerate_archives(&self, today: NaiveDate) -> Result<usize> {
        let mut total = 0;
        for account in self.publish_accounts().await? {
            match archive::backfill(&self.store, &account, &self.settings.base_url, today).await {
                Ok(pages) => total += pages.len(),
                Err(e) => {
                    tracing::error!(account = %account, error = %format!("{e:#}"), "backfill failed")
                }
            }
        }
        Ok(total)
    }
}
