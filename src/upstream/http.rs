// src/upstream/http.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Credentials, MediaRef, MediaType, Session, StoryClient, StoryItem};
use crate::error::{classify_status, UpstreamError};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_token: Option<&'a str>,
    secondary_identity: &'a str,
    secondary_credential: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    logged: bool,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct WireStory {
    id: String,
    media_type: MediaType,
    media_id: String,
    media_key: String,
    media_iv: String,
}

impl From<WireStory> for StoryItem {
    fn from(w: WireStory) -> Self {
        StoryItem {
            id: w.id,
            media_type: w.media_type,
            media: MediaRef {
                id: w.media_id,
                key: w.media_key,
                iv: w.media_iv,
            },
        }
    }
}

#[derive(Serialize)]
struct BlobRequest<'a> {
    media_id: &'a str,
    media_key: &'a str,
    media_iv: &'a str,
}

/// JSON client for the relay that fronts the story service.
///
/// The relay owns the private login protocol and media decryption; this side
/// only speaks plain HTTP:
/// - `POST /login`, `POST /session` → `{ "logged": bool, "auth_token": str }`
/// - `GET /stories` → `[{ id, media_type, media_id, media_key, media_iv }]`
/// - `POST /blob` → decrypted bytes, `204`/`404` when unavailable
#[derive(Clone)]
pub struct HttpStoryClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpStoryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn login(&self, path: &str, req: &LoginRequest<'_>) -> Result<Session, UpstreamError> {
        let rsp = self
            .client
            .post(self.url(path))
            .timeout(self.timeout)
            .json(req)
            .send()
            .await?;
        let rsp = check_status(rsp).await?;
        let body: LoginResponse = rsp.json().await?;
        match body.auth_token {
            Some(token) if body.logged => Ok(Session {
                username: req.username.to_string(),
                auth_token: token,
            }),
            _ => Err(UpstreamError::Auth(
                "invalid username or password".to_string(),
            )),
        }
    }
}

async fn check_status(rsp: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = rsp.status();
    if status.is_success() {
        return Ok(rsp);
    }
    let detail = rsp.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), detail.trim()))
}

#[async_trait]
impl StoryClient for HttpStoryClient {
    async fn authenticate(&self, creds: &Credentials) -> Result<Session, UpstreamError> {
        let Some(password) = creds.password.as_deref() else {
            return Err(UpstreamError::Auth("no password configured".to_string()));
        };
        let req = LoginRequest {
            username: &creds.username,
            password: Some(password),
            auth_token: None,
            secondary_identity: &creds.secondary_identity,
            secondary_credential: &creds.secondary_credential,
        };
        self.login("login", &req).await
    }

    async fn restore_session(
        &self,
        creds: &Credentials,
        auth_token: &str,
    ) -> Result<Session, UpstreamError> {
        let req = LoginRequest {
            username: &creds.username,
            password: None,
            auth_token: Some(auth_token),
            secondary_identity: &creds.secondary_identity,
            secondary_credential: &creds.secondary_credential,
        };
        self.login("session", &req).await
    }

    async fn list_stories(&self, session: &Session) -> Result<Vec<StoryItem>, UpstreamError> {
        let rsp = self
            .client
            .get(self.url("stories"))
            .timeout(self.timeout)
            .bearer_auth(&session.auth_token)
            .send()
            .await?;
        let rsp = check_status(rsp).await?;
        let stories: Vec<WireStory> = rsp.json().await?;
        Ok(stories.into_iter().map(StoryItem::from).collect())
    }

    async fn fetch_blob(
        &self,
        session: &Session,
        media: &MediaRef,
    ) -> Result<Option<Vec<u8>>, UpstreamError> {
        let rsp = self
            .client
            .post(self.url("blob"))
            .timeout(self.timeout)
            .bearer_auth(&session.auth_token)
            .json(&BlobRequest {
                media_id: &media.id,
                media_key: &media.key,
                media_iv: &media.iv,
            })
            .send()
            .await?;
        if matches!(rsp.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            return Ok(None);
        }
        let rsp = check_status(rsp).await?;
        let bytes = rsp.bytes().await?;
        if bytes.is_empty() {
            Ok(None)
        } else {
            Ok(Some(bytes.to_vec()))
        }
    }

    fn name(&self) -> &'static str {
        "http-relay"
    }
}
