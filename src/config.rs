use std::time::Duration;

use anyhow::{bail, Context};

use crate::repository::StoreTimeouts;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base of the delivery URLs handed out to clients.
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub s3: S3Config,
    pub store_timeouts: StoreTimeouts,
    pub asset_upload_timeout: Duration,
    pub asset_delete_timeout: Duration,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} must be set", name))
}

fn secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(default),
    )
}

impl StoreBackend {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown DOCUMENT_STORE {:?}, expected postgres or memory", other),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = StoreBackend::parse(
            &std::env::var("DOCUMENT_STORE").unwrap_or_else(|_| "postgres".into()),
        )?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fundhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fundhub-users".into()),
        };
        let s3 = S3Config {
            endpoint: required("S3_ENDPOINT")?,
            bucket: required("S3_BUCKET")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url: required("ASSET_PUBLIC_URL")?,
        };
        let store_timeouts = StoreTimeouts {
            read: secs("STORE_READ_TIMEOUT_SECS", 5),
            list: secs("STORE_LIST_TIMEOUT_SECS", 10),
            write: secs("STORE_WRITE_TIMEOUT_SECS", 5),
        };
        Ok(Self {
            store_backend,
            database_url,
            jwt,
            s3,
            store_timeouts,
            asset_upload_timeout: secs("ASSET_UPLOAD_TIMEOUT_SECS", 60),
            asset_delete_timeout: secs("ASSET_DELETE_TIMEOUT_SECS", 30),
        })
    }
}
