use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};

use crate::core::config::Settings;

/// Where uploaded quiz PDFs and PDF answers end up.
///
/// S3-compatible storage is used when credentials are configured; otherwise files are written
/// under the local upload directory and referenced as `/uploads/<key>`.
#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    backend: Backend,
}

#[derive(Debug, Clone)]
enum Backend {
    S3 { client: Client, bucket: String },
    Local { root: PathBuf },
}

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub(crate) reference: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        if !settings.s3().is_configured() {
            return Ok(Self::local(settings.storage().upload_dir.clone()));
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "lms-quiz-static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds);
        if !settings.s3().endpoint.is_empty() {
            loader = loader.endpoint_url(settings.s3().endpoint.clone());
        }
        let config = loader.load().await;

        Ok(Self {
            backend: Backend::S3 {
                client: Client::new(&config),
                bucket: settings.s3().bucket.clone(),
            },
        })
    }

    pub(crate) fn local(root: impl Into<PathBuf>) -> Self {
        Self { backend: Backend::Local { root: root.into() } }
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::S3 { .. } => "s3",
            Backend::Local { .. } => "local",
        }
    }

    pub(crate) async fn store(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        let relative = safe_relative_key(key)?;
        let size = bytes.len() as i64;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        let reference = match &self.backend {
            Backend::S3 { client, bucket } => {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(bytes))
                    .send()
                    .await
                    .with_context(|| format!("failed to upload {key} to bucket {bucket}"))?;
                format!("s3://{bucket}/{key}")
            }
            Backend::Local { root } => {
                let path = root.join(&relative);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                format!("/uploads/{key}")
            }
        };

        tracing::debug!(key, size, sha256 = %sha256, backend = self.backend_name(), "Stored object");

        Ok(StoredObject { reference, size, sha256 })
    }
}

impl StorageService {
    /// Removes an object written by `store`. A missing object is not an error.
    pub(crate) async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let relative = safe_relative_key(key)?;

        match &self.backend {
            Backend::S3 { client, bucket } => {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .with_context(|| format!("failed to delete {key} from bucket {bucket}"))?;
            }
            Backend::Local { root } => {
                let path = root.join(&relative);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        return Err(err).with_context(|| format!("failed to remove {}", path.display()))
                    }
                }
            }
        }

        tracing::debug!(key, backend = self.backend_name(), "Deleted object");
        Ok(())
    }
}

fn safe_relative_key(key: &str) -> anyhow::Result<PathBuf> {
    let path = Path::new(key);
    let safe = !key.is_empty() && path.components().all(|part| matches!(part, Component::Normal(_)));
    anyhow::ensure!(safe, "invalid storage key: {key}");
    Ok(path.to_path_buf())
}

/// Keeps ASCII letters, digits, dots, dashes and underscores; everything else becomes `_`.
pub(crate) fn sanitized_filename(filename: &str) -> String {
    let base = Path::new(filename).file_name().and_then(|name| name.to_str()).unwrap_or("file");

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
