use std::time::Duration;

use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::{byte_stream::ByteStream, error::display::DisplayErrorContext};
use axum::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::config::S3Config;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("cannot extract public id from {0:?}")]
    Extraction(String),

    #[error("asset host call timed out after {0:?}")]
    Timeout(Duration),
}

/// Remote image host. `upload` returns the public delivery URL; `delete`
/// takes the public-ID recovered from such a URL.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, folder: &str, body: Bytes, content_type: &str) -> Result<String, AssetError>;
    async fn delete(&self, public_id: &str) -> Result<(), AssetError>;
}

#[derive(Clone)]
pub struct S3AssetStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3AssetStore {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.clone(),
        })
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `<base>/v<version>/<public_id>.<ext>`
pub fn delivery_url(base: &str, version: i64, public_id: &str, ext: &str) -> String {
    format!("{}/v{}/{}.{}", base.trim_end_matches('/'), version, public_id, ext)
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn upload(&self, folder: &str, body: Bytes, content_type: &str) -> Result<String, AssetError> {
        let public_id = format!("{}/{}", folder, Uuid::now_v7());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&public_id)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AssetError::Upload(DisplayErrorContext(e).to_string()))?;

        let ext = ext_from_mime(content_type).unwrap_or("bin");
        let url = delivery_url(
            &self.public_url,
            OffsetDateTime::now_utc().unix_timestamp(),
            &public_id,
            ext,
        );
        debug!(%public_id, "asset uploaded");
        Ok(url)
    }

    async fn delete(&self, public_id: &str) -> Result<(), AssetError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .map_err(|e| AssetError::Delete(DisplayErrorContext(e).to_string()))?;
        debug!(%public_id, "asset deleted");
        Ok(())
    }
}
