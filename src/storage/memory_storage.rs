use crate::{
    domain::{Card, CardId},
    error::{CardsError, Result},
    storage::Storage,
};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;

/// Volatile storage, used for tests and embedded services
#[derive(Debug)]
pub struct MemoryStorage {
    cards: RwLock<BTreeMap<CardId, Card>>,
    next_id: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        true
    }

    async fn next_card_id(&self) -> Result<CardId> {
        Ok(CardId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        self.cards.write().await.insert(card.id, card.clone());
        Ok(())
    }

    async fn replace_card(&self, card: &Card) -> Result<()> {
        match self.cards.write().await.get_mut(&card.id) {
            Some(slot) => {
                *slot = card.clone();
                Ok(())
            }
            None => Err(CardsError::CardNotFound(card.id)),
        }
    }

    async fn load_card(&self, id: CardId) -> Result<Card> {
        self.cards
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CardsError::CardNotFound(id))
    }

    async fn list_cards(&self) -> Result<Vec<Card>> {
        Ok(self.cards.read().await.values().cloned().collect())
    }

    async fn delete_card(&self, id: CardId) -> Result<()> {
        self.cards
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(CardsError::CardNotFound(id))
    }

    async fn count_cards(&self) -> Result<usize> {
        Ok(self.cards.read().await.len())
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}
