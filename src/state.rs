use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::{
    config::{AppConfig, StoreBackend},
    repository::{Document, Repository},
    storage::{AssetStore, S3AssetStore},
    store::{DocumentStore, MemoryDocumentStore, PgDocumentStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pg = PgDocumentStore::connect(url, 10).await?;
                pg.migrate().await?;
                Arc::new(pg)
            }
            StoreBackend::Memory => {
                info!("using in-memory document store");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let assets = Arc::new(S3AssetStore::new(&config.s3).await?) as Arc<dyn AssetStore>;

        Ok(Self::from_parts(config, store, assets))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            config,
            store,
            assets,
        }
    }

    pub fn repo<T: Document>(&self) -> Repository<T> {
        Repository::new(self.store.clone(), self.config.store_timeouts)
    }
}
