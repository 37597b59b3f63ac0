// src/publish/archive.rs
//! Static day-by-day archive: `archive/<account>/<YYYY>/<MM>/<DD>.html`.
//!
//! Days are UTC calendar days. A day is taken as a [`NaiveDate`], so a window
//! can never start at anything but midnight.

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::{Path, PathBuf};
use url::Url;

use super::feed::{account_media, public_url};
use crate::store::{MediaName, MediaStore, Visibility};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Half-open `[start_ms, end_ms)` covering one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DayWindow {
    pub fn for_day(day: NaiveDate) -> Self {
        let start_ms = day.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        Self {
            day,
            start_ms,
            end_ms: start_ms + MS_PER_DAY,
        }
    }

    pub fn contains(&self, ms: i64) -> bool {
        self.start_ms <= ms && ms < self.end_ms
    }
}

/// UTC day a millisecond timestamp falls on.
pub fn day_of(ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|d| d.date_naive())
}

pub fn page_dir(account: &str, day: NaiveDate) -> PathBuf {
    Path::new("archive")
        .join(account)
        .join(format!("{:04}", day.year()))
        .join(format!("{:02}", day.month()))
}

pub fn page_rel_path(account: &str, day: NaiveDate) -> PathBuf {
    page_dir(account, day).join(format!("{:02}.html", day.day()))
}

/// Page URL by convention. The page itself may not exist.
pub fn page_url(base_url: &Url, account: &str, day: NaiveDate) -> Result<Url> {
    let rel = format!(
        "archive/{account}/{:04}/{:02}/{:02}.html",
        day.year(),
        day.month(),
        day.day()
    );
    public_url(base_url, &rel)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub link: String,
    pub title: String,
    pub is_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePage {
    pub account: String,
    pub day: NaiveDate,
    /// Newest first.
    pub entries: Vec<ArchiveEntry>,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

pub fn build_page(
    snapshot: &[MediaName],
    account: &str,
    day: NaiveDate,
    base_url: &Url,
) -> Result<ArchivePage> {
    let window = DayWindow::for_day(day);
    let mut entries = Vec::new();
    for name in account_media(snapshot, account) {
        let Some(ts) = name.timestamp_ms() else {
            continue;
        };
        if !window.contains(ts) {
            continue;
        }
        entries.push(ArchiveEntry {
            link: public_url(base_url, name.file_name())?.to_string(),
            title: name.file_name().to_string(),
            is_video: name.is_video(),
        });
    }

    let sibling = |d: Option<NaiveDate>| -> Result<Option<String>> {
        d.map(|d| page_url(base_url, account, d).map(|u| u.to_string()))
            .transpose()
    };

    Ok(ArchivePage {
        account: account.to_string(),
        day,
        entries,
        prev_link: sibling(day.pred_opt())?,
        next_link: sibling(day.succ_opt())?,
    })
}

pub fn render_html(page: &ArchivePage) -> String {
    let account = encode_text(&page.account);
    let date = page.day.format("%Y-%m-%d").to_string();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Stories for {account} on {date}</title>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{account} &middot; {date}</h1>\n"));

    html.push_str("<nav>\n");
    if let Some(prev) = &page.prev_link {
        html.push_str(&format!(
            "<a rel=\"prev\" href=\"{}\">&larr; previous day</a>\n",
            encode_double_quoted_attribute(prev)
        ));
    }
    if let Some(next) = &page.next_link {
        html.push_str(&format!(
            "<a rel=\"next\" href=\"{}\">next day &rarr;</a>\n",
            encode_double_quoted_attribute(next)
        ));
    }
    html.push_str("</nav>\n");

    if page.entries.is_empty() {
        html.push_str("<p>No stories on this day.</p>\n");
    }
    for e in &page.entries {
        let src = encode_double_quoted_attribute(&e.link);
        let title = encode_text(&e.title);
        html.push_str("<figure>\n");
        if e.is_video {
            html.push_str(&format!(
                "<video controls preload=\"metadata\" src=\"{src}\"></video>\n"
            ));
        } else {
            html.push_str(&format!(
                "<img src=\"{src}\" alt=\"{}\">\n",
                encode_double_quoted_attribute(&e.title)
            ));
        }
        html.push_str(&format!(
            "<figcaption><a href=\"{src}\">{title}</a></figcaption>\n</figure>\n"
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Render one day's page from a snapshot and write it, creating the
/// directory chain as needed.
pub async fn write_page(
    store: &MediaStore,
    snapshot: &[MediaName],
    account: &str,
    day: NaiveDate,
    base_url: &Url,
) -> Result<PathBuf> {
    let page = build_page(snapshot, account, day, base_url)?;
    store.ensure_dir(&page_dir(account, day)).await?;
    let path = store
        .write_atomic(
            &page_rel_path(account, day),
            render_html(&page).as_bytes(),
            Visibility::Public,
        )
        .await?;
    tracing::info!(
        account,
        day = %day,
        entries = page.entries.len(),
        "regenerated archive page"
    );
    Ok(path)
}

/// Earliest UTC day holding publishable media for `account`.
pub fn first_day(snapshot: &[MediaName], account: &str) -> Option<NaiveDate> {
    snapshot
        .iter()
        .filter(|n| n.account() == account && n.is_publishable())
        .filter_map(MediaName::timestamp_ms)
        .min()
        .and_then(day_of)
}

/// Generate every page from the account's first day through `today`.
/// An account without timestamped media is a no-op.
pub async fn backfill(
    store: &MediaStore,
    account: &str,
    base_url: &Url,
    today: NaiveDate,
) -> Result<Vec<PathBuf>> {
    let snapshot = store.snapshot().await?;
    let Some(first) = first_day(&snapshot, account) else {
        tracing::info!(account, "nothing to backfill");
        return Ok(Vec::new());
    };

    let mut written = Vec::new();
    for day in first.iter_days().take_while(|d| *d <= today) {
        written.push(write_page(store, &snapshot, account, day, base_url).await?);
    }
    tracing::info!(account, from = %first, to = %today, pages = written.len(), "archive backfill done");
    Ok(written)
}
