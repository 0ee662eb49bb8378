//! Typed clients for the card service.
//!
//! [`CardClient`] blocks the calling thread; [`AsyncCardClient`] returns
//! futures. Both build their requests and interpret responses through the
//! same call table in this module, so serialization and the status to error
//! mapping exist exactly once.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    api::{
        self, ApiRequest, ApiResponse, CountBody, Method, INTERNAL_SERVER_ERROR, NOT_FOUND,
        UNPROCESSABLE_ENTITY,
    },
    domain::{Card, CardId, CardUpdate, FilterCriteria, FilteredCards, NewCard},
    error::CardsError,
};

pub mod blocking;
pub mod http;
pub mod local;
pub mod nonblocking;
pub mod transport;

pub use blocking::CardClient;
pub use http::{AsyncHttpTransport, HttpTransport};
pub use local::{BlockingLocalTransport, LocalTransport};
pub use nonblocking::AsyncCardClient;
pub use transport::{AsyncTransport, Transport};

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid card id: {0}")]
    InvalidCardId(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Request failed with status {status}: {detail}")]
    Transport { status: u16, detail: String },

    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error(transparent)]
    Invalid(#[from] CardsError),

    #[error("Client is closed")]
    Closed,
}

/// Turns a non-success response into the matching error kind.
pub fn check_status(response: &ApiResponse) -> ClientResult<()> {
    if response.is_success() {
        return Ok(());
    }

    let detail = response.detail();
    Err(match response.status {
        NOT_FOUND => ClientError::InvalidCardId(detail),
        UNPROCESSABLE_ENTITY => ClientError::BadRequest(detail),
        INTERNAL_SERVER_ERROR => ClientError::InternalServerError(detail),
        status => ClientError::Transport { status, detail },
    })
}

fn decode_json<T: DeserializeOwned>(response: &ApiResponse) -> ClientResult<T> {
    serde_json::from_str(&response.body)
        .map_err(|e| ClientError::BadRequest(format!("malformed response: {}", e)))
}

fn decode_unit(_: &ApiResponse) -> ClientResult<()> {
    Ok(())
}

fn decode_count(response: &ApiResponse) -> ClientResult<usize> {
    decode_json::<CountBody>(response).map(|body| body.count)
}

/// A prepared request together with the decoder for its success body.
pub(crate) struct Call<T> {
    pub(crate) request: ApiRequest,
    decode: fn(&ApiResponse) -> ClientResult<T>,
}

impl<T> Call<T> {
    fn new(request: ApiRequest, decode: fn(&ApiResponse) -> ClientResult<T>) -> Self {
        Self { request, decode }
    }

    pub(crate) fn resolve(self, response: ApiResponse) -> ClientResult<T> {
        check_status(&response)?;
        (self.decode)(&response)
    }
}

pub(crate) mod calls {
    use super::*;

    pub(crate) fn health() -> Call<bool> {
        Call::new(ApiRequest::new(Method::Get, api::health_path()), decode_json)
    }

    pub(crate) fn db_path() -> Call<String> {
        Call::new(ApiRequest::new(Method::Get, api::db_path_path()), decode_json)
    }

    pub(crate) fn create(new_card: &NewCard) -> ClientResult<Call<Card>> {
        let body = serde_json::to_value(new_card).map_err(CardsError::from)?;
        Ok(Call::new(
            ApiRequest::new(Method::Post, api::cards_path()).with_body(body),
            decode_json,
        ))
    }

    pub(crate) fn get(id: CardId) -> Call<Card> {
        Call::new(ApiRequest::new(Method::Get, api::card_path(id)), decode_json)
    }

    pub(crate) fn delete(id: CardId) -> Call<()> {
        Call::new(ApiRequest::new(Method::Delete, api::card_path(id)), decode_unit)
    }

    /// Only the fields set on `update` are sent.
    pub(crate) fn update(id: CardId, update: &CardUpdate) -> ClientResult<Call<Card>> {
        let body = serde_json::to_value(update).map_err(CardsError::from)?;
        Ok(Call::new(
            ApiRequest::new(Method::Patch, api::card_path(id)).with_body(body),
            decode_json,
        ))
    }

    pub(crate) fn count() -> Call<usize> {
        Call::new(ApiRequest::new(Method::Get, api::count_path()), decode_count)
    }

    /// Validates the criteria before anything is sent.
    pub(crate) fn filter(criteria: &FilterCriteria) -> ClientResult<Call<FilteredCards>> {
        criteria.validate()?;
        Ok(Call::new(
            ApiRequest::new(Method::Get, api::filter_path()).with_query(criteria.to_query()),
            decode_json,
        ))
    }

    pub(crate) fn start(id: CardId) -> Call<()> {
        Call::new(ApiRequest::new(Method::Patch, api::start_path(id)), decode_unit)
    }

    pub(crate) fn finish(id: CardId) -> Call<()> {
        Call::new(ApiRequest::new(Method::Patch, api::finish_path(id)), decode_unit)
    }
}
