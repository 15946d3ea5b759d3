//! Evidence blob storage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// An uploaded evidence file.
#[derive(Debug, Clone)]
pub struct Evidence {
    /// Name the uploader gave the file, if any.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores evidence files and hands back a URL they can be fetched from.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, evidence: &Evidence) -> Result<String>;
}

/// Writes blobs into a local directory served under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    pub const DEFAULT_URL_PREFIX: &str = "/uploads";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: Self::DEFAULT_URL_PREFIX.to_owned(),
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, evidence: &Evidence) -> Result<String> {
        let name = format!("{}.{}", Uuid::new_v4().simple(), extension_for(evidence));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", self.dir.display()))?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &evidence.bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!(path = %path.display(), bytes = evidence.bytes.len(), "stored evidence");
        Ok(format!("{}/{name}", self.url_prefix))
    }
}

/// File extension for a stored blob: the uploaded name's extension when it
/// is short and alphanumeric, else one derived from the content type.
fn extension_for(evidence: &Evidence) -> String {
    let from_name = evidence
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    if let Some(ext) = from_name {
        return ext;
    }

    let ext = match evidence.content_type.as_deref() {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/heic") => "heic",
        Some("image/gif") => "gif",
        _ => "bin",
    };
    ext.to_owned()
}
