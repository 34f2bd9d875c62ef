use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{Config, StoreKind};
use crate::error::{Result, TriageError};
use crate::models::FeedbackItem;

#[cfg(test)]
use mockall::automock;

/// Read access to the object store holding the serialized collection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Object body for `key`, or `None` when the object does not exist
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Objects stored as files below a root directory
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.root.join(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TriageError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Objects served over HTTP at `{base_url}/{key}`
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(client: Client, base_url: String, api_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", self.base_url, key.trim_start_matches('/'));
        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TriageError::Storage(format!("GET {url} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TriageError::Storage(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| TriageError::Storage(format!("Failed to read body of {url}: {e}")))
    }
}

/// Produces the full feedback collection
#[async_trait]
pub trait FeedbackLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<FeedbackItem>>;
}

/// Loads the collection as one JSON array stored under a fixed key
pub struct BlobFeedbackLoader {
    blob: Arc<dyn BlobStore>,
    key: String,
}

impl BlobFeedbackLoader {
    pub fn new(blob: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blob,
            key: key.into(),
        }
    }
}

#[async_trait]
impl FeedbackLoader for BlobFeedbackLoader {
    async fn load(&self) -> Result<Vec<FeedbackItem>> {
        let body = self.blob.get(&self.key).await?.ok_or_else(|| {
            tracing::error!("{} not found in blob store", self.key);
            TriageError::NotFound(format!("Feedback data not found ({})", self.key))
        })?;

        let items: Vec<FeedbackItem> = serde_json::from_str(&body)?;

        let duplicates = {
            let mut seen = HashSet::with_capacity(items.len());
            items.iter().filter(|i| !seen.insert(i.id.as_str())).count()
        };
        if duplicates > 0 {
            tracing::warn!(
                key = %self.key,
                duplicates,
                "Feedback collection contains duplicate ids; lookups resolve to the first"
            );
        }

        tracing::info!(key = %self.key, items = items.len(), "Loaded feedback collection");
        Ok(items)
    }
}

/// Load-once holder for the feedback collection.
///
/// When caching is disabled every call goes to the loader. Failed loads are
/// not cached.
pub struct FeedbackCache {
    loader: Arc<dyn FeedbackLoader>,
    enabled: bool,
    cell: OnceCell<Arc<Vec<FeedbackItem>>>,
}

impl FeedbackCache {
    pub fn new(loader: Arc<dyn FeedbackLoader>, enabled: bool) -> Self {
        Self {
            loader,
            enabled,
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_load(&self) -> Result<Arc<Vec<FeedbackItem>>> {
        if !self.enabled {
            return Ok(Arc::new(self.loader.load().await?));
        }

        self.cell
            .get_or_try_init(|| async { self.loader.load().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }
}

/// Build the blob store selected by `store.kind`
pub fn build_blob_store(config: &Config) -> Result<Arc<dyn BlobStore>> {
    match config.store.kind {
        StoreKind::File => {
            tracing::info!(root = %config.store.path, "Using file blob store");
            Ok(Arc::new(FileBlobStore::new(&config.store.path)))
        }
        StoreKind::Http => {
            let base_url = config.store.base_url.clone().ok_or_else(|| {
                TriageError::Config("store.base_url is required for the http store".into())
            })?;
            let client = Client::builder()
                .timeout(config.store_timeout())
                .build()
                .map_err(|e| TriageError::Config(format!("Failed to build HTTP client: {e}")))?;
            tracing::info!(base_url = %base_url, "Using HTTP blob store");
            Ok(Arc::new(HttpBlobStore::new(
                client,
                base_url,
                config.store.api_token.clone(),
            )))
        }
    }
}

/// Loader returning a fixed collection and counting calls
#[cfg(test)]
pub(crate) struct StaticLoader {
    result: Option<Vec<FeedbackItem>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl StaticLoader {
    pub(crate) fn new(items: Vec<FeedbackItem>) -> Self {
        Self {
            result: Some(items),
            calls: Default::default(),
        }
    }

    /// A loader whose collection is missing
    pub(crate) fn missing() -> Self {
        Self {
            result: None,
            calls: Default::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl FeedbackLoader for StaticLoader {
    async fn load(&self) -> Result<Vec<FeedbackItem>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| TriageError::NotFound("Feedback data not found".into()))
    }
}
