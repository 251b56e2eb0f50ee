use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    self as s3,
    config::Credentials,
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::ImageUpload,
};

pub const PRODUCT_IMAGE_FOLDER: &str = "products";

/// Where uploaded product images live.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Stores the upload under `folder` and returns its relative path.
    async fn store(&self, upload: &ImageUpload, folder: &str) -> Result<String>;

    /// Removing a path that no longer exists is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    fn url_for(&self, path: &str) -> String;
}

fn object_key(upload: &ImageUpload, folder: &str) -> String {
    let extension = upload
        .kind()
        .map(|kind| kind.extension().to_string())
        .or_else(|| upload.extension())
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{}/{}.{}",
        folder.trim_matches('/'),
        Uuid::new_v4().simple(),
        extension
    )
}

fn content_type(upload: &ImageUpload) -> String {
    upload
        .kind()
        .map(|kind| kind.content_type().to_string())
        .or_else(|| upload.content_type.clone())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Writes images below a directory that is served as static files.
pub struct LocalImageStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalImageStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(AppError::StorageError(format!(
                "Refusing to touch path outside storage root: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(&self, upload: &ImageUpload, folder: &str) -> Result<String> {
        let key = object_key(upload, folder);
        let target = self.resolve(&key)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("{}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("{}: {}", target.display(), e)))?;

        tracing::info!("Stored image {} ({} bytes)", key, upload.bytes.len());

        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                tracing::info!("Deleted image {}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageError(format!(
                "{}: {}",
                target.display(),
                e
            ))),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path)
    }
}

/// Keeps images in an S3 bucket fronted by a public assets URL.
pub struct S3ImageStorage {
    client: s3::Client,
    bucket: String,
    assets_url: String,
}

impl S3ImageStorage {
    pub fn new(client: s3::Client, bucket: String, assets_url: String) -> Self {
        Self {
            client,
            bucket,
            assets_url: assets_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client from the environment. Explicit keys win over the
    /// default AWS credential chain.
    pub async fn connect(bucket: String, assets_url: String) -> Result<Self> {
        let aws_region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws_region));

        if let (Ok(access_key), Ok(secret_key)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "env-credentials",
            ));
        }

        let client = s3::Client::new(&loader.load().await);

        tracing::info!("AWS S3 client initialized for bucket {}", bucket);

        Ok(Self::new(client, bucket, assets_url))
    }
}

#[async_trait]
impl ImageStorage for S3ImageStorage {
    async fn store(&self, upload: &ImageUpload, folder: &str) -> Result<String> {
        let key = object_key(upload, folder);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type(upload))
            .body(ByteStream::from(upload.bytes.clone()))
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to upload {}: {}",
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::info!("Uploaded image {} to bucket {}", key, self.bucket);

        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to delete {}: {}",
                    path,
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::info!("Deleted image {} from bucket {}", path, self.bucket);

        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.assets_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif() -> ImageUpload {
        ImageUpload {
            file_name: "spinner.gif".to_string(),
            content_type: Some("image/gif".to_string()),
            bytes: b"GIF89a\x01\x00\x01\x00".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_local_store_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path(), "http://localhost/storage/");

        let path = storage.store(&gif(), PRODUCT_IMAGE_FOLDER).await.unwrap();

        assert!(path.starts_with("products/"));
        assert!(path.ends_with(".gif"));
        assert!(dir.path().join(&path).exists());
        assert_eq!(
            storage.url_for(&path),
            format!("http://localhost/storage/{}", path)
        );

        storage.delete(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());

        // already gone
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path(), "/storage");

        let result = storage.delete("../outside.png").await;

        assert!(matches!(result, Err(AppError::StorageError(_))));
    }
}
