// src/store/name.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use std::cmp::Ordering;

use crate::error::StoreError;
use crate::upstream::StoryItem;

/// Extensions that count as content; everything else is auxiliary.
pub const PUBLISHABLE_EXTENSIONS: [&str; 2] = ["mp4", "jpg"];

/// Millisecond epochs are zero-padded to this width so names sort by time.
pub const TOKEN_WIDTH: usize = 13;

/// Smallest numeric token read as a millisecond epoch (1973-03-03).
/// Shorter ids are plain ids, not dates in 1970.
pub const MIN_TIMESTAMP_MS: i64 = 100_000_000_000;

fn part_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

fn ext_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap())
}

fn safe_part(s: &str) -> bool {
    part_re().is_match(s) && !s.contains("..")
}

/// Whether `account` may appear in a file or directory name in the store.
pub fn is_valid_account(account: &str) -> bool {
    safe_part(account)
}

/// `<account>~<token>.<ext>`: identity, timestamp and kind of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaName {
    account: String,
    token: String,
    ext: String,
    timestamp_ms: Option<i64>,
    file_name: String,
}

impl MediaName {
    pub fn new(account: &str, token: &str, ext: &str) -> Result<Self, StoreError> {
        if !safe_part(account) || !safe_part(token) || !ext_re().is_match(ext) {
            return Err(StoreError::InvalidName(format!("{account}~{token}.{ext}")));
        }
        Ok(Self {
            account: account.to_string(),
            token: token.to_string(),
            ext: ext.to_ascii_lowercase(),
            timestamp_ms: parse_timestamp(token),
            file_name: format!("{account}~{token}.{}", ext.to_ascii_lowercase()),
        })
    }

    /// Canonical name for a story. Millisecond timestamps are zero-padded.
    pub fn for_story(item: &StoryItem) -> Result<Self, StoreError> {
        let account = item.account();
        let rest = item.id[account.len()..]
            .strip_prefix('~')
            .ok_or_else(|| StoreError::InvalidName(item.id.clone()))?;
        Self::new(account, &normalize_token(rest), item.media_type.extension())
    }

    /// Inverse of [`MediaName::file_name`]. Hidden and foreign files yield `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        if file_name.starts_with('.') {
            return None;
        }
        let (stem, ext) = file_name.rsplit_once('.')?;
        let (account, token) = stem.split_once('~')?;
        let name = Self::new(account, token, ext).ok()?;
        // Reject anything that does not round-trip, e.g. upper-case extensions.
        (name.file_name == file_name).then_some(name)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Same story, different extension (e.g. the `.zip` fallback).
    pub fn with_ext(&self, ext: &str) -> Self {
        Self {
            ext: ext.to_string(),
            file_name: format!("{}~{}.{}", self.account, self.token, ext),
            ..self.clone()
        }
    }

    /// Auxiliary companion such as `<account>~<token>_overlay.png`.
    pub fn companion(&self, suffix: &str, ext: &str) -> Self {
        let token = format!("{}{}", self.token, suffix);
        Self {
            account: self.account.clone(),
            file_name: format!("{}~{}.{}", self.account, token, ext),
            token,
            ext: ext.to_string(),
            timestamp_ms: None,
        }
    }

    pub fn is_publishable(&self) -> bool {
        PUBLISHABLE_EXTENSIONS.contains(&self.ext.as_str())
    }

    pub fn is_video(&self) -> bool {
        self.ext == "mp4"
    }

    fn sort_key(&self) -> (bool, i64, &str) {
        (
            self.timestamp_ms.is_some(),
            self.timestamp_ms.unwrap_or(0),
            &self.file_name,
        )
    }

    /// Newest first: by parsed timestamp, then name; untimed entries last.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.sort_key().cmp(&a.sort_key())
    }
}

fn normalize_token(rest: &str) -> String {
    match parse_timestamp(rest) {
        Some(ms) => format!("{ms:0width$}", width = TOKEN_WIDTH),
        None => rest.to_string(),
    }
}

fn parse_timestamp(token: &str) -> Option<i64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<i64>().ok().filter(|ms| *ms >= MIN_TIMESTAMP_MS)
}
