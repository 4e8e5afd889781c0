use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Retention store for raw uploaded bytes. The indexed text is what the
/// service queries; the original upload is only kept here.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
}

impl StorageManager {
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let store: DynStore = match backend_kind {
            StorageKind::Local => {
                let base = PathBuf::from(&cfg.data_dir);
                std::fs::create_dir_all(&base).map_err(|source| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: Box::new(source),
                    }
                })?;
                Arc::new(LocalFileSystem::new_with_prefix(base)?)
            }
            StorageKind::Memory => Arc::new(InMemory::new()),
        };

        Ok(Self {
            store,
            backend_kind,
        })
    }

    /// Inject a specific backend, mainly for tests.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind) -> Self {
        Self {
            store,
            backend_kind,
        }
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trips_bytes() {
        let config = AppConfig {
            storage: StorageKind::Memory,
            ..AppConfig::default()
        };
        let storage = StorageManager::new(&config)
            .await
            .expect("Failed to create storage manager");

        storage
            .put("documents/abc/sky.txt", Bytes::from_static(b"The sky is blue."))
            .await
            .expect("Failed to put object");

        let fetched = storage
            .get("documents/abc/sky.txt")
            .await
            .expect("Failed to get object");
        assert_eq!(fetched, Bytes::from_static(b"The sky is blue."));
    }

    #[tokio::test]
    async fn missing_object_is_an_error() {
        let storage = StorageManager::with_backend(Arc::new(InMemory::new()), StorageKind::Memory);
        assert!(storage.get("documents/none").await.is_err());
    }
}
