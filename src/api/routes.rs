use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::{
    api::{
        ApiRequest, ApiResponse, CountBody, Method, API_PREFIX, BAD_REQUEST, CREATED,
        INTERNAL_SERVER_ERROR, METHOD_NOT_ALLOWED, NOT_FOUND, NO_CONTENT, OK,
        UNPROCESSABLE_ENTITY,
    },
    domain::{CardId, CardUpdate, FilterCriteria, NewCard},
    error::CardsError,
    service::CardService,
    storage::Storage,
};

/// Maps a service error onto a status code and `detail` body.
pub fn error_response(err: &CardsError) -> ApiResponse {
    match err {
        CardsError::CardNotFound(_) => ApiResponse::error(NOT_FOUND, "Card not found"),
        CardsError::InvalidRange { .. } => ApiResponse::error(BAD_REQUEST, err.to_string()),
        CardsError::Validation(_)
        | CardsError::InvalidEnumValue { .. }
        | CardsError::InvalidCardId(_)
        | CardsError::SerializationError(_) => {
            ApiResponse::error(UNPROCESSABLE_ENTITY, err.to_string())
        }
        CardsError::StorageError(_) | CardsError::IoError(_) | CardsError::ConfigError(_) => {
            error!(error = %err, "card service failure");
            ApiResponse::error(INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, CardsError> {
    let body = body.ok_or_else(|| CardsError::Validation("Request body is required".to_string()))?;
    Ok(serde_json::from_value(body.clone())?)
}

fn into_response<T>(result: Result<T, CardsError>, ok: impl FnOnce(T) -> ApiResponse) -> ApiResponse {
    match result {
        Ok(value) => ok(value),
        Err(err) => error_response(&err),
    }
}

/// Dispatches wire requests onto a [`CardService`].
pub struct Router<S: Storage> {
    service: CardService<S>,
}

impl<S: Storage> Router<S> {
    pub fn new(service: CardService<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &CardService<S> {
        &self.service
    }

    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let Some(rest) = request.path.strip_prefix(API_PREFIX) else {
            return ApiResponse::error(NOT_FOUND, "Not Found");
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match (segments.as_slice(), request.method) {
            (["health"], Method::Get) => ApiResponse::json(OK, &self.service.health().await),
            (["db", "path"], Method::Get) => ApiResponse::json(OK, &self.service.metadata()),
            (["cards"], Method::Post) => self.create(request).await,
            (["cards", "count"], Method::Get) => into_response(self.service.count().await, |count| {
                ApiResponse::json(OK, &CountBody { count })
            }),
            (["cards", "filter"], Method::Get) => self.filter(request).await,
            (["cards", "start", id], Method::Patch) => match id.parse::<CardId>() {
                Ok(id) => into_response(self.service.start(id).await, |_| {
                    ApiResponse::empty(NO_CONTENT)
                }),
                Err(err) => error_response(&err),
            },
            (["cards", "finish", id], Method::Patch) => match id.parse::<CardId>() {
                Ok(id) => into_response(self.service.finish(id).await, |_| {
                    ApiResponse::empty(NO_CONTENT)
                }),
                Err(err) => error_response(&err),
            },
            (["cards", id], method) if !matches!(*id, "count" | "filter") => {
                match id.parse::<CardId>() {
                    Ok(id) => self.card(id, method, request).await,
                    Err(err) => error_response(&err),
                }
            }
            (["health"], _)
            | (["db", "path"], _)
            | (["cards"], _)
            | (["cards", _], _)
            | (["cards", "start" | "finish", _], _) => {
                ApiResponse::error(METHOD_NOT_ALLOWED, "Method Not Allowed")
            }
            _ => ApiResponse::error(NOT_FOUND, "Not Found"),
        }
    }

    async fn create(&self, request: &ApiRequest) -> ApiResponse {
        let new_card = match parse_body::<NewCard>(request.body.as_ref()) {
            Ok(new_card) => new_card,
            Err(err) => return error_response(&err),
        };
        into_response(self.service.create(new_card).await, |card| {
            ApiResponse::json(CREATED, &card)
        })
    }

    async fn filter(&self, request: &ApiRequest) -> ApiResponse {
        let criteria = match FilterCriteria::from_query(&request.query) {
            Ok(criteria) => criteria,
            Err(err) => return error_response(&err),
        };
        into_response(self.service.list(&criteria).await, |filtered| {
            ApiResponse::json(OK, &filtered)
        })
    }

    async fn card(&self, id: CardId, method: Method, request: &ApiRequest) -> ApiResponse {
        match method {
            Method::Get => into_response(self.service.get(id).await, |card| {
                ApiResponse::json(OK, &card)
            }),
            Method::Delete => into_response(self.service.delete(id).await, |_| {
                ApiResponse::empty(NO_CONTENT)
            }),
            Method::Patch => {
                let update = match parse_body::<CardUpdate>(request.body.as_ref()) {
                    Ok(update) => update,
                    Err(err) => return error_response(&err),
                };
                into_response(self.service.update(id, &update).await, |card| {
                    ApiResponse::json(OK, &card)
                })
            }
            Method::Post => ApiResponse::error(METHOD_NOT_ALLOWED, "Method Not Allowed"),
        }
    }
}
