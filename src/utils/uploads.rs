use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub type BlobResult<T> = std::result::Result<T, BlobError>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("empty file")]
    EmptyFile,
}

/// URL prefix under which `uploads_dir` is served.
pub static STATIC_PREFIX: &str = "/api/v1/static";

/// Stores bytes and hands back a URL. Callers keep only the URL.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    async fn store(&self, namespace: &str, filename: &str, bytes: &[u8]) -> BlobResult<String>;
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, namespace: &str, filename: &str, bytes: &[u8]) -> BlobResult<String> {
        if bytes.is_empty() {
            return Err(BlobError::EmptyFile);
        }

        let dir = self.root.join(sanitize_filename(namespace));
        tokio::fs::create_dir_all(&dir).await?;

        let stored = format!("{}-{}", uuid::Uuid::new_v4().simple(), sanitize_filename(filename));
        tokio::fs::write(dir.join(&stored), bytes).await?;

        tracing::debug!("stored {} bytes as {}/{}", bytes.len(), namespace, stored);
        Ok(format!("{STATIC_PREFIX}/{}/{stored}", sanitize_filename(namespace)))
    }
}

/// Keeps `[A-Za-z0-9._-]`, everything else (path separators included) becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        String::from("file")
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("report final.pdf"), "report_final.pdf");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[tokio::test]
    async fn local_store_writes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let url = store.store("assignments", "essay.txt", b"hello").await.unwrap();
        assert!(url.starts_with("/api/v1/static/assignments/"));
        assert!(url.ends_with("-essay.txt"));

        let stored_name = url.rsplit('/').next().unwrap();
        let bytes = std::fs::read(dir.path().join("assignments").join(stored_name)).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(matches!(
            store.store("assignments", "a.txt", b"").await,
            Err(BlobError::EmptyFile)
        ));
    }
}
