//! Wire-level request and response shapes shared by the router and the
//! client transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::CardId;

pub mod routes;

pub use routes::Router;

pub const API_PREFIX: &str = "/api";

pub const OK: u16 = 200;
pub const CREATED: u16 = 201;
pub const NO_CONTENT: u16 = 204;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const METHOD_NOT_ALLOWED: u16 = 405;
pub const UNPROCESSABLE_ENTITY: u16 = 422;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request against the card service. `path` includes [`API_PREFIX`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status code plus raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(status, body),
            Err(err) => Self::error(INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, String::new())
    }

    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorBody {
                detail: detail.into(),
            },
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `detail` of an error body, or the raw body when it has none.
    pub fn detail(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| self.body.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountBody {
    pub count: usize,
}

pub fn health_path() -> String {
    format!("{}/health", API_PREFIX)
}

pub fn db_path_path() -> String {
    format!("{}/db/path", API_PREFIX)
}

pub fn cards_path() -> String {
    format!("{}/cards/", API_PREFIX)
}

pub fn card_path(id: CardId) -> String {
    format!("{}/cards/{}", API_PREFIX, id)
}

pub fn count_path() -> String {
    format!("{}/cards/count/", API_PREFIX)
}

pub fn filter_path() -> String {
    format!("{}/cards/filter/", API_PREFIX)
}

pub fn start_path(id: CardId) -> String {
    format!("{}/cards/start/{}", API_PREFIX, id)
}

pub fn finish_path(id: CardId) -> String {
    format!("{}/cards/finish/{}", API_PREFIX, id)
}
