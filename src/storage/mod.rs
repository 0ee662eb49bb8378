use crate::{
    config::{StorageBackend, StorageConfig},
    domain::{Card, CardId, FilterSet},
    error::{CardsError, Result},
};
use async_trait::async_trait;

#[cfg(feature = "file-storage")]
pub mod file_storage;
pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// Storage trait for persisting cards.
///
/// Implementations own id assignment and must serialize concurrent
/// writers; callers exchange independent `Card` snapshots.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Checks if the backend is initialized
    async fn is_initialized(&self) -> bool;

    /// Reserves the next unused card ID. IDs are never reused.
    async fn next_card_id(&self) -> Result<CardId>;

    /// Stores a freshly created card
    async fn save_card(&self, card: &Card) -> Result<()>;

    /// Overwrites an existing card. Fails with `CardNotFound` when the card
    /// is gone, so a write never resurrects a deleted card.
    async fn replace_card(&self, card: &Card) -> Result<()>;

    /// Loads a card by ID
    async fn load_card(&self, id: CardId) -> Result<Card>;

    /// Lists all cards ordered by ID
    async fn list_cards(&self) -> Result<Vec<Card>>;

    /// Deletes a card
    async fn delete_card(&self, id: CardId) -> Result<()>;

    /// Counts stored cards
    async fn count_cards(&self) -> Result<usize> {
        Ok(self.list_cards().await?.len())
    }

    /// Lists the cards matching every filter in the set, ordered by ID
    async fn query_cards(&self, filters: &FilterSet) -> Result<Vec<Card>> {
        Ok(filters.apply(self.list_cards().await?))
    }

    /// Human-readable location of the stored data
    fn location(&self) -> String;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Box<S> {
    async fn initialize(&self) -> Result<()> {
        (**self).initialize().await
    }

    async fn is_initialized(&self) -> bool {
        (**self).is_initialized().await
    }

    async fn next_card_id(&self) -> Result<CardId> {
        (**self).next_card_id().await
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        (**self).save_card(card).await
    }

    async fn replace_card(&self, card: &Card) -> Result<()> {
        (**self).replace_card(card).await
    }

    async fn load_card(&self, id: CardId) -> Result<Card> {
        (**self).load_card(id).await
    }

    async fn list_cards(&self) -> Result<Vec<Card>> {
        (**self).list_cards().await
    }

    async fn delete_card(&self, id: CardId) -> Result<()> {
        (**self).delete_card(id).await
    }

    async fn count_cards(&self) -> Result<usize> {
        (**self).count_cards().await
    }

    async fn query_cards(&self, filters: &FilterSet) -> Result<Vec<Card>> {
        (**self).query_cards(filters).await
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Opens and initializes the backend selected in the configuration.
///
/// A backend whose cargo feature is disabled is a `ConfigError`.
pub async fn open(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    let storage: Box<dyn Storage> = match config.backend {
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
        #[cfg(feature = "file-storage")]
        StorageBackend::File => Box::new(FileStorage::from_config(config)),
        #[cfg(feature = "sqlite-storage")]
        StorageBackend::Sqlite => Box::new(SqliteStorage::from_config(config)?),
        #[allow(unreachable_patterns)]
        backend => {
            return Err(CardsError::ConfigError(format!(
                "storage backend {:?} is not compiled in",
                backend
            )))
        }
    };

    storage.initialize().await?;
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::NewCard, service::CardService};
    use std::path::Path;
    use tempfile::TempDir;

    fn config(backend: StorageBackend, root: &Path) -> StorageConfig {
        StorageConfig {
            backend,
            root: root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let temp_dir = TempDir::new().unwrap();
        let storage = open(&config(StorageBackend::Memory, temp_dir.path()))
            .await
            .unwrap();

        assert_eq!(storage.location(), "memory://");
        assert!(storage.is_initialized().await);
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_open_file_backend_serves_cards() {
        let temp_dir = TempDir::new().unwrap();
        let storage = open(&config(StorageBackend::File, temp_dir.path()))
            .await
            .unwrap();
        assert!(storage.location().ends_with(".cards"));

        let service = CardService::new(storage);
        assert!(service.health().await);

        let card = service.create(NewCard::new("Boxed")).await.unwrap();
        service.start(card.id).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
        assert!(temp_dir.path().join(".cards").join("cards").join("1.json").exists());
    }

    #[cfg(feature = "sqlite-storage")]
    #[tokio::test]
    async fn test_open_sqlite_backend() {
        let temp_dir = TempDir::new().unwrap();
        let storage = open(&config(StorageBackend::Sqlite, temp_dir.path()))
            .await
            .unwrap();

        assert!(storage.location().ends_with("cards.sqlite"));
        assert!(storage.is_initialized().await);
    }

    #[cfg(not(feature = "sqlite-storage"))]
    #[tokio::test]
    async fn test_open_sqlite_without_feature_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            open(&config(StorageBackend::Sqlite, temp_dir.path())).await,
            Err(CardsError::ConfigError(_))
        ));
    }
}
