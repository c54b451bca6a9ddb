//! Versioned object storage for PDF binaries.
//!
//! Keys look like `{site prefix}/{document id}/document.pdf`. Every write
//! creates a new version; readers list versions newest first. A local
//! filesystem store is always available, S3 behind the `s3` feature.

mod filesystem;
#[cfg(feature = "s3")]
mod s3;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use filesystem::FilesystemStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("storage not configured: {0}")]
    Unconfigured(String),
}

/// Metadata for one stored version of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FileVersion {
    pub version_id: String,
    pub modification_date: DateTime<Utc>,
    pub size: u64,
    pub etag: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` as the newest version of `key`.
    async fn put(&self, key: &str, data: &[u8]) -> Result<FileVersion, StorageError>;

    /// All versions of `key`, newest first. Unknown keys yield an empty list.
    async fn list_versions(&self, key: &str) -> Result<Vec<FileVersion>, StorageError>;

    /// Bytes of one version.
    async fn get_version(&self, key: &str, version_id: &str) -> Result<Vec<u8>, StorageError>;
}

/// Versions of `key`; failures are logged and read as "no versions".
pub async fn file_versions(store: &dyn ObjectStore, key: &str) -> Vec<FileVersion> {
    match store.list_versions(key).await {
        Ok(versions) => versions,
        Err(e) => {
            warn!("Could not list versions of {}: {}", key, e);
            Vec::new()
        }
    }
}

/// Newest version of `key`, if any.
pub async fn latest_file(store: &dyn ObjectStore, key: &str) -> Option<FileVersion> {
    file_versions(store, key).await.into_iter().next()
}

/// Content of a specific version; failures are logged and read as `None`.
pub async fn file_version(store: &dyn ObjectStore, key: &str, version_id: &str) -> Option<Vec<u8>> {
    match store.get_version(key, version_id).await {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("Could not fetch {} version {}: {}", key, version_id, e);
            None
        }
    }
}

/// Where PDFs are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageSettings {
    Filesystem {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key_id: Option<String>,
        #[serde(default)]
        secret_access_key: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
}

impl StorageSettings {
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        match self {
            StorageSettings::Filesystem { root } => Ok(Arc::new(FilesystemStore::new(root.clone()))),
            #[cfg(feature = "s3")]
            StorageSettings::S3 { .. } => Ok(Arc::new(S3Store::from_settings(self)?)),
            #[cfg(not(feature = "s3"))]
            StorageSettings::S3 { .. } => Err(StorageError::Unconfigured(
                "S3 support not compiled. Use --features s3".to_string(),
            )),
        }
    }

    /// One-line summary without credentials.
    pub fn describe(&self) -> String {
        match self {
            StorageSettings::Filesystem { root } => format!("filesystem at {}", root.display()),
            StorageSettings::S3 {
                bucket, endpoint, ..
            } => match endpoint {
                Some(endpoint) => format!("s3://{} via {}", bucket, endpoint),
                None => format!("s3://{}", bucket),
            },
        }
    }
}

/// Reject keys that could escape the store root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("www-city-gov/42/document.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
    }

    #[test]
    fn test_settings_parse() {
        let fs: StorageSettings =
            serde_json::from_str(r#"{"backend":"filesystem","root":"/srv/pdfs"}"#).unwrap();
        assert_eq!(fs, StorageSettings::Filesystem { root: "/srv/pdfs".into() });

        let s3: StorageSettings =
            serde_json::from_str(r#"{"backend":"s3","bucket":"cfa-aistudio-asap-pdf"}"#).unwrap();
        assert!(matches!(s3, StorageSettings::S3 { ref bucket, force_path_style: false, .. } if bucket == "cfa-aistudio-asap-pdf"));
    }

    #[tokio::test]
    async fn test_helpers_swallow_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        assert!(file_versions(&store, "../escape").await.is_empty());
        assert!(latest_file(&store, "site/1/document.pdf").await.is_none());
        assert!(file_version(&store, "site/1/document.pdf", "nope").await.is_none());
    }
}
