//! The card service: the boundary the clients talk to.
//!
//! Every operation loads a snapshot from storage, applies the lifecycle or
//! filter rules to it and writes it back.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    domain::{Card, CardId, CardUpdate, FilterCriteria, FilterSet, FilteredCards, NewCard},
    error::{CardsError, Result},
    storage::Storage,
};

pub struct CardService<S: Storage> {
    storage: Arc<S>,
    // Held across every load-modify-write cycle and every delete; shared by clones
    write_lock: Arc<Mutex<()>>,
}

impl<S: Storage> Clone for CardService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<S: Storage> CardService<S> {
    /// Wraps storage as is. `health` reports false until the storage has
    /// been initialized; use [`CardService::open`] to do that up front.
    pub fn new(storage: S) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    pub fn from_shared(storage: Arc<S>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Initializes the storage and wraps it.
    pub async fn open(storage: S) -> Result<Self> {
        storage.initialize().await?;
        Ok(Self::new(storage))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn health(&self) -> bool {
        self.storage.is_initialized().await
    }

    /// Where the cards are stored.
    pub fn metadata(&self) -> String {
        self.storage.location()
    }

    pub async fn create(&self, new_card: NewCard) -> Result<Card> {
        let id = self.storage.next_card_id().await?;
        let card = Card::create(id, new_card, Utc::now())?;
        self.storage.save_card(&card).await?;

        debug!(%id, state = %card.state, priority = %card.priority, "created card");
        Ok(card)
    }

    pub async fn get(&self, id: CardId) -> Result<Card> {
        self.storage.load_card(id).await
    }

    pub async fn delete(&self, id: CardId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.delete_card(id).await?;
        debug!(%id, "deleted card");
        Ok(())
    }

    pub async fn update(&self, id: CardId, update: &CardUpdate) -> Result<Card> {
        let _guard = self.write_lock.lock().await;
        let mut card = self.storage.load_card(id).await?;
        card.apply_update(update)?;
        self.storage.replace_card(&card).await?;

        debug!(%id, ?update, "updated card");
        Ok(card)
    }

    pub async fn count(&self) -> Result<usize> {
        self.storage.count_cards().await
    }

    /// Lists the cards matching the criteria, echoing the filters applied.
    /// An inverted date range is rejected before storage is touched.
    pub async fn list(&self, criteria: &FilterCriteria) -> Result<FilteredCards> {
        debug!(
            states = ?criteria.states,
            priorities = ?criteria.priorities,
            lowest_create_date = ?criteria.lowest_create_date,
            highest_create_date = ?criteria.highest_create_date,
            "read card filters"
        );

        let filters = FilterSet::build(criteria).map_err(|err| {
            if let CardsError::InvalidRange { lowest, highest } = &err {
                warn!(%lowest, %highest, "bad dates in filters");
            }
            err
        })?;

        let cards = self.storage.query_cards(&filters).await?;
        Ok(FilteredCards {
            offset: 0,
            filters,
            cards,
        })
    }

    pub async fn start(&self, id: CardId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut card = self.storage.load_card(id).await?;
        card.start(Utc::now());
        self.storage.replace_card(&card).await?;

        debug!(%id, "started card");
        Ok(())
    }

    pub async fn finish(&self, id: CardId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut card = self.storage.load_card(id).await?;
        card.finish(Utc::now());
        self.storage.replace_card(&card).await?;

        debug!(%id, "finished card");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Priority, State},
        storage::MemoryStorage,
    };
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Memory storage whose next `load_card` parks until released.
    #[derive(Default)]
    struct PausingStorage {
        inner: MemoryStorage,
        armed: AtomicBool,
        paused: Notify,
        resume: Notify,
    }

    impl PausingStorage {
        fn pause_next_load(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Storage for PausingStorage {
        async fn initialize(&self) -> Result<()> {
            self.inner.initialize().await
        }

        async fn is_initialized(&self) -> bool {
            self.inner.is_initialized().await
        }

        async fn next_card_id(&self) -> Result<CardId> {
            self.inner.next_card_id().await
        }

        async fn save_card(&self, card: &Card) -> Result<()> {
            self.inner.save_card(card).await
        }

        async fn replace_card(&self, card: &Card) -> Result<()> {
            self.inner.replace_card(card).await
        }

        async fn load_card(&self, id: CardId) -> Result<Card> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.paused.notify_one();
                self.resume.notified().await;
            }
            self.inner.load_card(id).await
        }

        async fn list_cards(&self) -> Result<Vec<Card>> {
            self.inner.list_cards().await
        }

        async fn delete_card(&self, id: CardId) -> Result<()> {
            self.inner.delete_card(id).await
        }

        fn location(&self) -> String {
            self.inner.location()
        }
    }

    fn service() -> CardService<MemoryStorage> {
        CardService::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let service = service();

        for title in ["A", "B", "C"] {
            let card = service.create(NewCard::new(title)).await.unwrap();
            assert_eq!(card.state, State::Todo);
            assert_eq!(card.priority, Priority::Low);
            assert!(card.started_at.is_none());
            assert!(card.finished_at.is_none());
        }
        assert_eq!(service.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_each_initial_state() {
        let service = service();

        for state in State::ALL {
            let before = Utc::now();
            let card = service
                .create(NewCard::new("Test").with_state(state))
                .await
                .unwrap();
            assert!(card.created_at >= before);

            match state {
                State::Todo => {
                    assert!(card.started_at.is_none());
                    assert!(card.finished_at.is_none());
                }
                State::InProgress => {
                    assert!(card.started_at.is_some());
                    assert!(card.finished_at.is_none());
                }
                State::Done => {
                    assert!(card.started_at.is_some());
                    assert_eq!(card.started_at, card.finished_at);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let service = service();
        assert!(matches!(
            service.create(NewCard::new("")).await,
            Err(CardsError::Validation(_))
        ));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_then_finish() {
        let service = service();
        let card = service.create(NewCard::new("Work")).await.unwrap();

        let before_start = Utc::now();
        service.start(card.id).await.unwrap();
        let started = service.get(card.id).await.unwrap();
        assert_eq!(started.state, State::InProgress);
        assert!(started.started_at.unwrap() >= before_start);
        assert!(started.finished_at.is_none());

        let before_finish = Utc::now();
        service.finish(card.id).await.unwrap();
        let finished = service.get(card.id).await.unwrap();
        assert_eq!(finished.state, State::Done);
        assert_eq!(finished.started_at, started.started_at);
        assert!(finished.finished_at.unwrap() >= before_finish);
        assert!(finished.started_at <= finished.finished_at);
    }

    #[tokio::test]
    async fn test_start_leaves_other_cards_untouched() {
        let service = service();
        let card = service.create(NewCard::new("Test")).await.unwrap();
        let other_1 = service.create(NewCard::new("Other 1")).await.unwrap();
        let other_2 = service.create(NewCard::new("Other 2")).await.unwrap();

        service.start(card.id).await.unwrap();

        assert_eq!(service.get(other_1.id).await.unwrap(), other_1);
        assert_eq!(service.get(other_2.id).await.unwrap(), other_2);
    }

    #[tokio::test]
    async fn test_update_priority_only() {
        let service = service();
        let card = service
            .create(NewCard::new("og title").with_summary("og summary"))
            .await
            .unwrap();

        let updated = service
            .update(card.id, &CardUpdate::default().priority(Priority::Medium))
            .await
            .unwrap();

        assert_eq!(updated.priority, Priority::Medium);
        assert_eq!(updated.title, card.title);
        assert_eq!(updated.summary, card.summary);
        assert_eq!(updated.state, card.state);
        assert_eq!(updated.created_at, card.created_at);
        assert_eq!(updated.started_at, card.started_at);
        assert_eq!(updated.finished_at, card.finished_at);
        assert_eq!(service.get(card.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let service = service();
        let missing = CardId::new(100);

        assert!(matches!(service.get(missing).await, Err(CardsError::CardNotFound(_))));
        assert!(matches!(service.start(missing).await, Err(CardsError::CardNotFound(_))));
        assert!(matches!(service.finish(missing).await, Err(CardsError::CardNotFound(_))));
        assert!(matches!(service.delete(missing).await, Err(CardsError::CardNotFound(_))));
        assert!(matches!(
            service.update(missing, &CardUpdate::default().title("x")).await,
            Err(CardsError::CardNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let service = service();
        let card = service.create(NewCard::new("Doomed")).await.unwrap();

        service.delete(card.id).await.unwrap();

        assert!(matches!(service.get(card.id).await, Err(CardsError::CardNotFound(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    async fn seed(service: &CardService<MemoryStorage>) {
        let rows = [
            (State::Todo, Priority::Low, 1),
            (State::Todo, Priority::Medium, 2),
            (State::Todo, Priority::High, 3),
            (State::Todo, Priority::Urgent, 4),
            (State::InProgress, Priority::Low, 5),
            (State::Done, Priority::Low, 6),
        ];
        for (i, (state, priority, month)) in rows.into_iter().enumerate() {
            let id = service.storage().next_card_id().await.unwrap();
            let created = Utc.with_ymd_and_hms(2022, month, 1, 10, 10, 10).unwrap();
            let new_card = NewCard::new(format!("title {}", i + 1))
                .with_state(state)
                .with_priority(priority);
            let card = Card::create(id, new_card, created).unwrap();
            service.storage().save_card(&card).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_list_done_cards() {
        let service = service();
        seed(&service).await;

        let result = service
            .list(&FilterCriteria::new().states([State::Done]))
            .await
            .unwrap();

        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.cards[0].id, CardId::new(6));
        assert_eq!(result.filters.len(), 1);
        assert_eq!(result.offset, 0);
    }

    #[tokio::test]
    async fn test_list_without_criteria_echoes_empty_filters() {
        let service = service();
        seed(&service).await;

        let result = service.list(&FilterCriteria::new()).await.unwrap();
        assert_eq!(result.cards.len(), 6);
        assert!(result.filters.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_range() {
        let service = service();
        let criteria = FilterCriteria::new()
            .lowest_create_date(NaiveDate::from_ymd_opt(2022, 6, 1).unwrap())
            .highest_create_date(NaiveDate::from_ymd_opt(2022, 5, 1).unwrap());

        assert!(matches!(
            service.list(&criteria).await,
            Err(CardsError::InvalidRange { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_during_start_stays_deleted() {
        let storage = Arc::new(PausingStorage::default());
        let service = CardService::from_shared(Arc::clone(&storage));
        let id = service.create(NewCard::new("Racy")).await.unwrap().id;

        storage.pause_next_load();
        let starting = {
            let service = service.clone();
            tokio::spawn(async move { service.start(id).await })
        };
        storage.paused.notified().await;

        let deleting = {
            let service = service.clone();
            tokio::spawn(async move { service.delete(id).await })
        };
        tokio::task::yield_now().await;
        storage.resume.notify_one();

        let started = starting.await.unwrap();
        assert!(matches!(started, Ok(()) | Err(CardsError::CardNotFound(_))));
        deleting.await.unwrap().unwrap();

        assert!(matches!(service.get(id).await, Err(CardsError::CardNotFound(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let service = service();
        let id = service.create(NewCard::new("Shared")).await.unwrap().id;

        let renaming = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .update(id, &CardUpdate::default().title("Renamed"))
                    .await
            })
        };
        let starting = {
            let service = service.clone();
            tokio::spawn(async move { service.start(id).await })
        };
        renaming.await.unwrap().unwrap();
        starting.await.unwrap().unwrap();

        let stored = service.get(id).await.unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.state, State::InProgress);
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_open_initializes_storage() {
        use crate::storage::FileStorage;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();

        let lazy = CardService::new(FileStorage::new(temp_dir.path()));
        assert!(!lazy.health().await);

        let opened = CardService::open(FileStorage::new(temp_dir.path())).await.unwrap();
        assert!(opened.health().await);
        assert!(lazy.health().await);
    }

    #[tokio::test]
    async fn test_health_and_metadata() {
        let service = service();
        assert!(service.health().await);
        assert_eq!(service.metadata(), "memory://");
    }
}
