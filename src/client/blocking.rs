use crate::{
    client::{calls, Call, ClientError, ClientResult, HttpTransport, Transport},
    config::ServerConfig,
    domain::{Card, CardId, CardUpdate, FilterCriteria, FilteredCards, NewCard},
};

/// Blocking card client. Every method runs to completion before returning.
pub struct CardClient<T: Transport = HttpTransport> {
    transport: Option<T>,
}

impl CardClient<HttpTransport> {
    /// Connects to the service described by `config` over HTTP.
    pub fn connect(config: &ServerConfig) -> ClientResult<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> CardClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    fn execute<R>(&self, call: Call<R>) -> ClientResult<R> {
        let transport = self.transport.as_ref().ok_or(ClientError::Closed)?;
        let response = transport.send(&call.request)?;
        call.resolve(response)
    }

    pub fn is_healthy(&self) -> ClientResult<bool> {
        self.execute(calls::health())
    }

    /// Storage location reported by the service.
    pub fn db_path(&self) -> ClientResult<String> {
        self.execute(calls::db_path())
    }

    pub fn create_card(&self, new_card: &NewCard) -> ClientResult<Card> {
        self.execute(calls::create(new_card)?)
    }

    pub fn get_card(&self, id: CardId) -> ClientResult<Card> {
        self.execute(calls::get(id))
    }

    pub fn delete_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::delete(id))
    }

    pub fn update_card(&self, id: CardId, update: &CardUpdate) -> ClientResult<Card> {
        self.execute(calls::update(id, update)?)
    }

    pub fn card_count(&self) -> ClientResult<usize> {
        self.execute(calls::count())
    }

    /// Filtered listing including the filters the service applied.
    pub fn filter_cards(&self, criteria: &FilterCriteria) -> ClientResult<FilteredCards> {
        self.execute(calls::filter(criteria)?)
    }

    pub fn list_cards(&self, criteria: &FilterCriteria) -> ClientResult<Vec<Card>> {
        self.filter_cards(criteria).map(|filtered| filtered.cards)
    }

    pub fn start_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::start(id))
    }

    pub fn finish_card(&self, id: CardId) -> ClientResult<()> {
        self.execute(calls::finish(id))
    }

    /// Releases the underlying connection. Calling it again does nothing.
    pub fn close(&mut self) {
        self.transport.take();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}
