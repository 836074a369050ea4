use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::io::{AudioClip, AudioDecoder};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("could not decode {location}: {reason}")]
    Decode { location: String, reason: String },
    #[error("transport failure for {location}: {reason}")]
    Transport { location: String, reason: String },
}

/// Fetches and decodes the recording stored at `location`.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, location: &str) -> Result<Arc<AudioClip>, LoadError>;
}

/// Loads recordings from the local filesystem, decoding off the async threads.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Resolves relative locations against `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match &self.base {
            Some(base) => base.join(location),
            None => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl AssetLoader for FileLoader {
    async fn load(&self, location: &str) -> Result<Arc<AudioClip>, LoadError> {
        let path = self.resolve(location);
        if !path.is_file() {
            warn!(path = %path.display(), "lehra asset missing");
            return Err(LoadError::NotFound(location.to_string()));
        }
        debug!(path = %path.display(), "decoding lehra asset");
        let owned = location.to_string();
        let decoded = tokio::task::spawn_blocking(move || AudioDecoder::open(&path))
            .await
            .map_err(|err| LoadError::Transport {
                location: owned.clone(),
                reason: err.to_string(),
            })?;
        decoded.map(Arc::new).map_err(|err| LoadError::Decode {
            location: owned,
            reason: format!("{err:#}"),
        })
    }
}
