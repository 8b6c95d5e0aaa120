//! The explicitly constructed backend handle passed into every operation.

use std::sync::Arc;

use hub_shared::{BlobStorage, ChangeFeed, Functions, Tables};
use hub_store::LocalBackend;
use tracing::info;

use crate::config::ClientConfig;
use crate::remote::{HttpFunctions, HttpStorage};

/// One implementation of each persistence boundary.
///
/// Cheap to clone; nothing in the crate keeps a process-wide client.
#[derive(Clone)]
pub struct HubClient {
    tables: Arc<dyn Tables>,
    blobs: Arc<dyn BlobStorage>,
    feed: Arc<dyn ChangeFeed>,
    functions: Arc<dyn Functions>,
    max_media_size: usize,
}

impl HubClient {
    pub fn new(
        tables: Arc<dyn Tables>,
        blobs: Arc<dyn BlobStorage>,
        feed: Arc<dyn ChangeFeed>,
        functions: Arc<dyn Functions>,
    ) -> Self {
        Self {
            tables,
            blobs,
            feed,
            functions,
            max_media_size: hub_shared::constants::MAX_MEDIA_SIZE,
        }
    }

    /// Use one backend for every boundary.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: Tables + BlobStorage + ChangeFeed + Functions + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    /// Open the local backend described by `config`, swapping in the HTTP
    /// collaborators for storage and functions when their URLs are set.
    pub async fn connect(config: &ClientConfig) -> Result<Self, hub_store::StoreError> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => hub_store::database::default_data_dir()?,
        };
        let backend = Arc::new(
            LocalBackend::open(&data_dir, config.public_url.clone(), config.max_media_size).await?,
        );

        let mut client = Self::from_backend(backend).with_max_media_size(config.max_media_size);

        if let Some(url) = &config.storage_url {
            info!(url = %url, "using remote blob storage");
            client = client.with_blobs(Arc::new(HttpStorage::new(url.clone(), config.api_key.clone())));
        }
        if let Some(url) = &config.functions_url {
            info!(url = %url, "using remote functions");
            client = client.with_functions(Arc::new(HttpFunctions::new(url.clone(), config.api_key.clone())));
        }

        Ok(client)
    }

    pub fn with_tables(mut self, tables: Arc<dyn Tables>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStorage>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn with_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_functions(mut self, functions: Arc<dyn Functions>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_max_media_size(mut self, max: usize) -> Self {
        self.max_media_size = max;
        self
    }

    pub fn tables(&self) -> &dyn Tables {
        self.tables.as_ref()
    }

    pub fn blobs(&self) -> &dyn BlobStorage {
        self.blobs.as_ref()
    }

    pub fn feed(&self) -> &dyn ChangeFeed {
        self.feed.as_ref()
    }

    pub fn functions(&self) -> &dyn Functions {
        self.functions.as_ref()
    }

    pub fn max_media_size(&self) -> usize {
        self.max_media_size
    }
}
