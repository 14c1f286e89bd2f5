//! Object storage for uploaded product images.
//!
//! [`S3ObjectStore`] talks to S3 or any S3-compatible endpoint;
//! [`LocalObjectStore`] writes beneath a directory that the router serves at
//! [`LOCAL_PUBLIC_PREFIX`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use vitashop_core::uploads::DEFAULT_MAX_UPLOAD_BYTES;

use crate::config::{env_opt, env_or};

/// URL path under which the local backend's files are served.
pub const LOCAL_PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2).
    pub s3_endpoint: Option<String>,
    /// Base URL prepended to object keys in responses.
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    /// Load storage settings from the environment.
    ///
    /// | Env Var              | Default            |
    /// |----------------------|--------------------|
    /// | `STORAGE_BACKEND`    | `local`            |
    /// | `LOCAL_STORAGE_PATH` | `storage/uploads`  |
    /// | `S3_BUCKET`          | required for `s3`  |
    /// | `S3_REGION`          | `us-east-1`        |
    /// | `S3_ENDPOINT`        | unset              |
    /// | `STORAGE_PUBLIC_URL` | backend default    |
    /// | `MAX_UPLOAD_BYTES`   | `5242880`          |
    ///
    /// # Panics
    ///
    /// Panics on an unknown backend name.
    pub fn from_env() -> Self {
        let backend = match env_or("STORAGE_BACKEND", "local".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            "s3" => StorageBackend::S3,
            other => panic!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        Self {
            backend,
            local_path: PathBuf::from(env_or(
                "LOCAL_STORAGE_PATH",
                "storage/uploads".to_string(),
            )),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_or("S3_REGION", "us-east-1".to_string()),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            public_url: env_opt("STORAGE_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage is misconfigured: {0}")]
    Misconfigured(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Build the configured backend.
pub async fn build_object_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.backend {
        StorageBackend::Local => {
            let base = config
                .public_url
                .clone()
                .unwrap_or_else(|| LOCAL_PUBLIC_PREFIX.to_string());
            Ok(Arc::new(LocalObjectStore::new(&config.local_path, base)))
        }
        StorageBackend::S3 => Ok(Arc::new(S3ObjectStore::from_config(config).await?)),
    }
}

// ---------------------------------------------------------------------------
// Local disk
// ---------------------------------------------------------------------------

pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), "Stored object on disk");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let bucket = config
            .s3_bucket
            .clone()
            .ok_or_else(|| StorageError::Misconfigured("S3_BUCKET is not set".into()))?;

        let shared = aws_config::from_env()
            .region(Region::new(config.s3_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        let public_base = config.public_url.clone().unwrap_or_else(|| {
            format!("https://{bucket}.s3.{}.amazonaws.com", config.s3_region)
        });

        tracing::info!(%bucket, region = %config.s3_region, "S3 object store ready");
        Ok(Self {
            client,
            bucket,
            public_base,
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // DeleteObject succeeds for absent keys, so check existence first.
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| head_object_error(key, &e))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}

fn head_object_error(key: &str, err: &SdkError<HeadObjectError>) -> StorageError {
    missing_or_backend(key, err.as_service_error(), || {
        DisplayErrorContext(err).to_string()
    })
}

fn missing_or_backend(
    key: &str,
    service_error: Option<&HeadObjectError>,
    describe: impl FnOnce() -> String,
) -> StorageError {
    match service_error {
        Some(e) if e.is_not_found() => StorageError::NotFound(key.to_string()),
        _ => StorageError::Backend(describe()),
    }
}
