// src/upstream/mod.rs
pub mod fake;
pub mod http;

use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Kind of media behind a story, decoded from the upstream integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MediaType {
    Image,
    Video,
    VideoNoAudio,
    Other(u8),
}

impl From<u8> for MediaType {
    fn from(code: u8) -> Self {
        match code {
            0 => MediaType::Image,
            1 => MediaType::Video,
            2 => MediaType::VideoNoAudio,
            other => MediaType::Other(other),
        }
    }
}

impl From<MediaType> for u8 {
    fn from(t: MediaType) -> Self {
        match t {
            MediaType::Image => 0,
            MediaType::Video => 1,
            MediaType::VideoNoAudio => 2,
            MediaType::Other(code) => code,
        }
    }
}

impl MediaType {
    /// File extension used for the stored blob.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Image => "jpg",
            MediaType::Video | MediaType::VideoNoAudio => "mp4",
            MediaType::Other(_) => "bin",
        }
    }
}

/// Encrypted media reference; the client resolves it to plain bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub key: String,
    pub iv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    /// Composite id, `<account>~<rest>`.
    pub id: String,
    pub media_type: MediaType,
    pub media: MediaRef,
}

impl StoryItem {
    /// Owning account, i.e. everything before the first `~`.
    pub fn account(&self) -> &str {
        self.id.split('~').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub secondary_identity: String,
    pub secondary_credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub auth_token: String,
}

#[async_trait::async_trait]
pub trait StoryClient: Send + Sync {
    /// Credential login.
    async fn authenticate(&self, creds: &Credentials) -> Result<Session, UpstreamError>;

    /// Resume a session from a token obtained earlier.
    async fn restore_session(
        &self,
        creds: &Credentials,
        auth_token: &str,
    ) -> Result<Session, UpstreamError>;

    /// Stories currently visible to the session.
    async fn list_stories(&self, session: &Session) -> Result<Vec<StoryItem>, UpstreamError>;

    /// Decrypted media. `Ok(None)` means nothing decodable is available right now.
    async fn fetch_blob(
        &self,
        session: &Session,
        media: &MediaRef,
    ) -> Result<Option<Vec<u8>>, UpstreamError>;

    fn name(&self) -> &'static str;
}
