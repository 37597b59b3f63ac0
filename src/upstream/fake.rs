// src/upstream/fake.rs
//! Scripted in-memory client used by tests and local dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Credentials, MediaRef, MediaType, Session, StoryClient, StoryItem};
use crate::error::UpstreamError;

/// What `fetch_blob` returns for a given media id.
#[derive(Debug, Clone)]
pub enum FakeBlob {
    Data(Vec<u8>),
    Unavailable,
    Fail,
    Overload,
    /// The session is rejected, as when it expires mid-run.
    Reject,
    /// Never resolves; exercises the fetch timeout.
    Hang,
}

pub struct FakeStoryClient {
    password: String,
    stories: Mutex<Vec<StoryItem>>,
    blobs: Mutex<HashMap<String, FakeBlob>>,
    list_error: Mutex<Option<UpstreamError>>,
    pub fetch_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FakeStoryClient {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            stories: Mutex::new(Vec::new()),
            blobs: Mutex::new(HashMap::new()),
            list_error: Mutex::new(None),
            fetch_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Add a story whose media id equals its composite id.
    pub fn with_story(self, id: &str, media_type: MediaType, blob: FakeBlob) -> Self {
        self.push_story(id, media_type, blob);
        self
    }

    pub fn push_story(&self, id: &str, media_type: MediaType, blob: FakeBlob) {
        let item = StoryItem {
            id: id.to_string(),
            media_type,
            media: MediaRef {
                id: id.to_string(),
                key: "key".to_string(),
                iv: "iv".to_string(),
            },
        };
        self.stories.lock().unwrap().push(item);
        self.blobs.lock().unwrap().insert(id.to_string(), blob);
    }

    /// Make every `list_stories` call fail with `err` until cleared.
    pub fn with_list_error(self, err: UpstreamError) -> Self {
        self.set_list_error(Some(err));
        self
    }

    pub fn set_list_error(&self, err: Option<UpstreamError>) {
        *self.list_error.lock().unwrap() = err;
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryClient for FakeStoryClient {
    async fn authenticate(&self, creds: &Credentials) -> Result<Session, UpstreamError> {
        if creds.password.as_deref() == Some(self.password.as_str()) {
            Ok(Session {
                username: creds.username.clone(),
                auth_token: format!("token-{}", creds.username),
            })
        } else {
            Err(UpstreamError::Auth("invalid username or password".into()))
        }
    }

    async fn restore_session(
        &self,
        creds: &Credentials,
        auth_token: &str,
    ) -> Result<Session, UpstreamError> {
        if auth_token.is_empty() {
            return Err(UpstreamError::Auth("empty token".into()));
        }
        Ok(Session {
            username: creds.username.clone(),
            auth_token: auth_token.to_string(),
        })
    }

    async fn list_stories(&self, _session: &Session) -> Result<Vec<StoryItem>, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.stories.lock().unwrap().clone())
    }

    async fn fetch_blob(
        &self,
        _session: &Session,
        media: &MediaRef,
    ) -> Result<Option<Vec<u8>>, UpstreamError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.blobs.lock().unwrap().get(&media.id).cloned();
        match outcome {
            Some(FakeBlob::Data(bytes)) => Ok(Some(bytes)),
            Some(FakeBlob::Unavailable) | None => Ok(None),
            Some(FakeBlob::Fail) => Err(UpstreamError::Transient("scripted failure".into())),
            Some(FakeBlob::Overload) => Err(UpstreamError::Overloaded { status: 429 }),
            Some(FakeBlob::Reject) => Err(UpstreamError::Auth("session expired".into())),
            Some(FakeBlob::Hang) => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
