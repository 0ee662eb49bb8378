use futures::future::try_join_all;

use crate::{
    client::{calls, AsyncHttpTransport, AsyncTransport, Call, ClientError, ClientResult},
    config::ServerConfig,
    domain::{Card, CardId, CardUpdate, FilterCriteria, FilteredCards, NewCard},
};

/// Concurrent card client with the same contract as
/// [`CardClient`](crate::client::CardClient); operations are awaited instead
/// of blocking the calling thread.
pub struct AsyncCardClient<T: AsyncTransport = AsyncHttpTransport> {
    transport: Option<T>,
}

impl AsyncCardClient<AsyncHttpTransport> {
    pub fn connect(config: &ServerConfig) -> ClientResult<Self> {
        Ok(Self::with_transport(AsyncHttpTransport::new(config)?))
    }
}

impl<T: AsyncTransport> AsyncCardClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    async fn execute<R>(&self, call: Call<R>) -> ClientResult<R> {
        let transport = self.transport.as_ref().ok_or(ClientError::Closed)?;
        let response = transport.send(&call.request).await?;
        call.resolve(response)
    }

    pub async fn is_healthy(&self) -> ClientResult<bool> {
        self.execute(calls::health()).await
    }

    pub async fn db_path(&self) -> ClientResult<String> {
        self.execute(calls::db_path()).await
    }

    pub async fn create_card(&self, new_card: &NewCard) -> ClientResult<Card> {
        self.execute(calls::create(new_card)?).await
    }

    /// Issues one create per input concurrently. Results come back in input
    /// order; the ids assigned are unique but their order is unspecified.
    pub async fn create_cards(&self, new_cards: &[NewCard]) -> ClientResult<Vec<Card>> {
        try_join_all(new_cards.iter().map(|new_card| self.create_card(new_card))).await
    }

    pub async fn get_card(&self, id: CardId) -> ClientResult<Card> {
        self.execute(calls::get(id)).await
    }

    pub async fn delete_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::delete(id)).await
    }

    pub async fn update_card(&self, id: CardId, update: &CardUpdate) -> ClientResult<Card> {
        self.execute(calls::update(id, update)?).await
    }

    pub async fn card_count(&self) -> ClientResult<usize> {
        self.execute(calls::count()).await
    }

    pub async fn filter_cards(&self, criteria: &FilterCriteria) -> ClientResult<FilteredCards> {
        self.execute(calls::filter(criteria)?).await
    }

    pub async fn list_cards(&self, criteria: &FilterCriteria) -> ClientResult<Vec<Card>> {
        self.filter_cards(criteria).await.map(|filtered| filtered.cards)
    }

    pub async fn start_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::start(id)).await
    }

    pub async fn finish_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::finish(id)).await
    }

    /// Releases the underlying connection. Calling it again does nothing.
    pub fn close(&mut self) {
        self.transport.take();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::Router,
        client::{BlockingLocalTransport, CardClient, LocalTransport},
        domain::{Priority, State},
        service::CardService,
        storage::MemoryStorage,
    };
    use std::{collections::HashSet, sync::Arc};

    fn client() -> AsyncCardClient<LocalTransport<MemoryStorage>> {
        let service = CardService::new(MemoryStorage::new());
        AsyncCardClient::with_transport(LocalTransport::new(service))
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let client = client();
        let new_cards: Vec<_> = ["A", "B", "C"].into_iter().map(NewCard::new).collect();

        let cards = client.create_cards(&new_cards).await.unwrap();

        let titles: Vec<_> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        for card in &cards {
            assert_eq!(card.state, State::Todo);
            assert_eq!(card.priority, Priority::Low);
            assert!(card.started_at.is_none());
            assert!(card.finished_at.is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_unique_ids() {
        let client = Arc::new(client());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    client
                        .create_card(&NewCard::new(format!("card {}", i)))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap().id));
        }
        assert_eq!(client.card_count().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_errors_are_mapped() {
        let client = client();
        let missing = CardId::new(404);

        assert!(matches!(
            client.get_card(missing).await,
            Err(ClientError::InvalidCardId(_))
        ));
        assert!(matches!(
            client.start_card(missing).await,
            Err(ClientError::InvalidCardId(_))
        ));
        assert!(matches!(
            client.create_card(&NewCard::new("")).await,
            Err(ClientError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_finish_todo_card() {
        let client = client();
        let card = client.create_card(&NewCard::new("Quick fix")).await.unwrap();

        client.finish_card(card.id).await.unwrap();

        let finished = client.get_card(card.id).await.unwrap();
        assert_eq!(finished.state, State::Done);
        assert!(finished.started_at.is_some());
        assert_eq!(finished.started_at, finished.finished_at);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut client = client();
        client.close();
        client.close();

        assert!(client.is_closed());
        assert!(matches!(client.card_count().await, Err(ClientError::Closed)));
    }

    /// Outcome of a scripted session, without timestamps.
    type Outcome = (Vec<(u64, String, State, Priority)>, usize, bool, bool);

    fn summarize(cards: &[Card]) -> Vec<(u64, String, State, Priority)> {
        cards
            .iter()
            .map(|c| (c.id.value(), c.title.clone(), c.state, c.priority))
            .collect()
    }

    fn blocking_session() -> Outcome {
        let router = Arc::new(Router::new(CardService::new(MemoryStorage::new())));
        let client = CardClient::with_transport(BlockingLocalTransport::from_router(router).unwrap());

        let a = client.create_card(&NewCard::new("A")).unwrap();
        let b = client.create_card(&NewCard::new("B")).unwrap();
        let c = client
            .create_card(&NewCard::new("C").with_state(State::InProgress))
            .unwrap();
        client.start_card(a.id).unwrap();
        client.finish_card(b.id).unwrap();
        client
            .update_card(c.id, &CardUpdate::default().priority(Priority::Urgent))
            .unwrap();
        client.delete_card(a.id).unwrap();

        let cards = client.list_cards(&FilterCriteria::new()).unwrap();
        let missing = matches!(client.get_card(a.id), Err(ClientError::InvalidCardId(_)));
        (
            summarize(&cards),
            client.card_count().unwrap(),
            client.is_healthy().unwrap(),
            missing,
        )
    }

    async fn async_session() -> Outcome {
        let client = client();

        let a = client.create_card(&NewCard::new("A")).await.unwrap();
        let b = client.create_card(&NewCard::new("B")).await.unwrap();
        let c = client
            .create_card(&NewCard::new("C").with_state(State::InProgress))
            .await
            .unwrap();
        client.start_card(a.id).await.unwrap();
        client.finish_card(b.id).await.unwrap();
        client
            .update_card(c.id, &CardUpdate::default().priority(Priority::Urgent))
            .await
            .unwrap();
        client.delete_card(a.id).await.unwrap();

        let cards = client.list_cards(&FilterCriteria::new()).await.unwrap();
        let missing = matches!(
            client.get_card(a.id).await,
            Err(ClientError::InvalidCardId(_))
        );
        (
            summarize(&cards),
            client.card_count().await.unwrap(),
            client.is_healthy().await.unwrap(),
            missing,
        )
    }

    #[test]
    fn test_blocking_and_async_clients_agree() {
        let blocking = blocking_session();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let concurrent = runtime.block_on(async_session());

        assert_eq!(blocking, concurrent);
        assert_eq!(
            blocking.0,
            vec![
                (2, "B".to_string(), State::Done, Priority::Low),
                (3, "C".to_string(), State::InProgress, Priority::Urgent),
            ]
        );
    }
}
