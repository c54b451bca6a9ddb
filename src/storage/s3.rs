//! S3 (or S3-compatible) versioned bucket.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{validate_key, FileVersion, ObjectStore, StorageError, StorageSettings};

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    client: Client,
    bucket: String,
}

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()).unwrap_or(DateTime::UNIX_EPOCH)
}

impl S3Store {
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let StorageSettings::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            force_path_style,
        } = settings
        else {
            return Err(StorageError::Unconfigured("not an S3 configuration".into()));
        };

        let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) else {
            return Err(StorageError::Unconfigured(
                "S3 storage needs access_key_id and secret_access_key".into(),
            ));
        };

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(
                region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            ))
            .credentials_provider(Credentials::new(key_id, secret, None, None, "asap-pdf"))
            .force_path_style(*force_path_style);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: &[u8]) -> Result<FileVersion, StorageError> {
        validate_key(key)?;
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/pdf")
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(backend)?;

        debug!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(FileVersion {
            version_id: output.version_id().unwrap_or("null").to_string(),
            modification_date: Utc::now(),
            size: data.len() as u64,
            etag: output.e_tag().unwrap_or_default().trim_matches('"').to_string(),
        })
    }

    async fn list_versions(&self, key: &str) -> Result<Vec<FileVersion>, StorageError> {
        validate_key(key)?;
        let output = self
            .client
            .list_object_versions()
            .bucket(&self.bucket)
            .prefix(key)
            .send()
            .await
            .map_err(backend)?;

        let mut versions: Vec<FileVersion> = output
            .versions()
            .iter()
            .filter(|v| v.key() == Some(key))
            .map(|v| FileVersion {
                version_id: v.version_id().unwrap_or("null").to_string(),
                modification_date: v
                    .last_modified()
                    .map(to_chrono)
                    .unwrap_or(DateTime::UNIX_EPOCH),
                size: v.size().unwrap_or(0).max(0) as u64,
                etag: v.e_tag().unwrap_or_default().trim_matches('"').to_string(),
            })
            .collect();
        versions.sort_by(|a, b| b.modification_date.cmp(&a.modification_date));
        Ok(versions)
    }

    async fn get_version(&self, key: &str, version_id: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(err) if err.is_no_such_key() => {
                    StorageError::NotFound(format!("{}@{}", key, version_id))
                }
                _ => backend(e),
            })?;

        let bytes = output.body.collect().await.map_err(backend)?.into_bytes();
        Ok(bytes.to_vec())
    }
}
