// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod poll;
pub mod publish;
pub mod store;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::error::{ConfigError, StoreError, UpstreamError};
pub use crate::poll::{Authenticated, Gateway, GatewaySettings, TickReport};
pub use crate::store::{MediaName, MediaStore, Visibility};
pub use crate::upstream::{StoryClient, StoryItem};
