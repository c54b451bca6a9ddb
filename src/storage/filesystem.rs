//! Object store on the local filesystem.
//!
//! Each key is a directory; each version a file inside it named
//! `{micros since epoch, zero padded}-{random}` so names sort by age.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use super::{validate_key, FileVersion, ObjectStore, StorageError};

pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn key_dir(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn version_path(&self, key: &str, version_id: &str) -> Result<PathBuf, StorageError> {
        validate_key(version_id)?;
        if version_id.contains('/') {
            return Err(StorageError::InvalidKey(version_id.to_string()));
        }
        Ok(self.key_dir(key)?.join(version_id))
    }

    async fn describe(&self, key: &str, version_id: &str) -> Result<FileVersion, StorageError> {
        let path = self.version_path(key, version_id)?;
        let data = fs::read(&path).await?;
        Ok(FileVersion {
            version_id: version_id.to_string(),
            modification_date: version_timestamp(version_id).unwrap_or(DateTime::UNIX_EPOCH),
            size: data.len() as u64,
            etag: hex::encode(Sha256::digest(&data)),
        })
    }
}

fn version_timestamp(version_id: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = version_id.split('-').next()?.parse().ok()?;
    DateTime::from_timestamp_micros(micros)
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<FileVersion, StorageError> {
        let dir = self.key_dir(key)?;
        fs::create_dir_all(&dir).await?;

        let version_id = format!(
            "{:020}-{}",
            Utc::now().timestamp_micros(),
            uuid::Uuid::new_v4().simple()
        );
        // Write then rename so readers never see a partial version
        let tmp = dir.join(format!(".{}.tmp", version_id));
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, dir.join(&version_id)).await?;

        debug!("Stored {} version {} ({} bytes)", key, version_id, data.len());
        self.describe(key, &version_id).await
    }

    async fn list_versions(&self, key: &str) -> Result<Vec<FileVersion>, StorageError> {
        let dir = self.key_dir(key)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') && entry.file_type().await?.is_file() {
                ids.push(name);
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut versions = Vec::with_capacity(ids.len());
        for id in ids {
            versions.push(self.describe(key, &id).await?);
        }
        Ok(versions)
    }

    async fn get_version(&self, key: &str, version_id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.version_path(key, version_id)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{}@{}", key, version_id)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        let key = "www-city-gov/7/document.pdf";

        assert!(store.list_versions(key).await.unwrap().is_empty());

        let v1 = store.put(key, b"%PDF-1.4 first").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let v2 = store.put(key, b"%PDF-1.7 second!").await.unwrap();

        let versions = store.list_versions(key).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_id, v2.version_id);
        assert_eq!(versions[1].version_id, v1.version_id);
        assert_eq!(versions[0].size, 16);
        assert_ne!(versions[0].etag, versions[1].etag);
        assert!(versions[0].modification_date >= versions[1].modification_date);

        assert_eq!(store.get_version(key, &v1.version_id).await.unwrap(), b"%PDF-1.4 first");
        assert!(matches!(
            store.get_version(key, "00000000000000000000-missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get_version(key, "../../etc").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
