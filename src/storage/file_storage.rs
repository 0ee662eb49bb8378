use crate::{
    config::StorageConfig,
    domain::{Card, CardId},
    error::{CardsError, Result},
    storage::Storage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::{fs, sync::Mutex};
use tracing::debug;

/// Bookkeeping stored next to the cards.
#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    next_card_id: u64,
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self { next_card_id: 1 }
    }
}

/// File-based storage implementation, one JSON document per card
pub struct FileStorage {
    root_path: PathBuf,
    // Serializes read-modify-write cycles of meta.json
    meta_lock: Mutex<()>,
    // Held by replace and delete so an existence check and its write are atomic
    cards_lock: Mutex<()>,
}

impl FileStorage {
    const CARDS_DIR: &'static str = ".cards";
    const CARD_FILES_DIR: &'static str = "cards";
    const META_FILE: &'static str = "meta.json";

    /// Creates a new FileStorage instance for the given data root
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: data_root.as_ref().join(Self::CARDS_DIR),
            meta_lock: Mutex::new(()),
            cards_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root)
    }

    fn card_files_dir(&self) -> PathBuf {
        self.root_path.join(Self::CARD_FILES_DIR)
    }

    fn meta_file(&self) -> PathBuf {
        self.root_path.join(Self::META_FILE)
    }

    fn card_file(&self, id: CardId) -> PathBuf {
        self.card_files_dir().join(format!("{}.json", id))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    async fn load_meta(&self) -> Result<StoreMeta> {
        let meta_file = self.meta_file();
        if !meta_file.exists() {
            return Ok(StoreMeta::default());
        }

        let contents = fs::read_to_string(&meta_file).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn save_meta(&self, meta: &StoreMeta) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let json = serde_json::to_string_pretty(meta)?;
        fs::write(self.meta_file(), json).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;
        self.ensure_directory_exists(&self.card_files_dir()).await?;

        let _guard = self.meta_lock.lock().await;
        if !self.meta_file().exists() {
            self.save_meta(&StoreMeta::default()).await?;
        }

        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.meta_file().exists()
    }

    async fn next_card_id(&self) -> Result<CardId> {
        let _guard = self.meta_lock.lock().await;

        let mut meta = self.load_meta().await?;
        let id = CardId::new(meta.next_card_id);
        meta.next_card_id += 1;
        self.save_meta(&meta).await?;

        Ok(id)
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        self.ensure_directory_exists(&self.card_files_dir()).await?;

        let json = serde_json::to_string_pretty(card)?;
        let file_path = self.card_file(card.id);

        fs::write(&file_path, json).await?;
        debug!(id = %card.id, path = %file_path.display(), "saved card");
        Ok(())
    }

    async fn replace_card(&self, card: &Card) -> Result<()> {
        let _guard = self.cards_lock.lock().await;
        let file_path = self.card_file(card.id);

        if !file_path.exists() {
            return Err(CardsError::CardNotFound(card.id));
        }

        let json = serde_json::to_string_pretty(card)?;
        fs::write(&file_path, json).await?;
        debug!(id = %card.id, path = %file_path.display(), "replaced card");
        Ok(())
    }

    async fn load_card(&self, id: CardId) -> Result<Card> {
        let file_path = self.card_file(id);

        if !file_path.exists() {
            return Err(CardsError::CardNotFound(id));
        }

        let contents = fs::read_to_string(&file_path).await?;
        let card: Card = serde_json::from_str(&contents)?;

        Ok(card)
    }

    async fn list_cards(&self) -> Result<Vec<Card>> {
        let card_files_dir = self.card_files_dir();

        if !card_files_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&card_files_dir).await?;
        let mut ids: Vec<CardId> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(id) = CardId::from_str(stem) {
                        ids.push(id);
                    }
                }
            }
        }

        ids.sort();

        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            cards.push(self.load_card(id).await?);
        }
        Ok(cards)
    }

    async fn delete_card(&self, id: CardId) -> Result<()> {
        let _guard = self.cards_lock.lock().await;
        let file_path = self.card_file(id);

        if !file_path.exists() {
            return Err(CardsError::CardNotFound(id));
        }

        fs::remove_file(&file_path).await?;
        debug!(%id, "deleted card");
        Ok(())
    }

    fn location(&self) -> String {
        self.root_path.display().to_string()
    }
}
