//! reqwest-backed transports.

use async_trait::async_trait;
use tracing::trace;

use crate::{
    api::{ApiRequest, ApiResponse, Method},
    client::{AsyncTransport, ClientResult, Transport},
    config::ServerConfig,
};

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Blocking HTTP transport. Must not be used from inside an async runtime.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> ClientResult<Self> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            base_url: config.base_url(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        trace!(method = %request.method, path = %request.path, "sending request");

        let mut builder = self.client.request(
            to_reqwest(request.method),
            format!("{}{}", self.base_url, request.path),
        );
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ApiResponse::new(status, body))
    }
}

/// Async HTTP transport sharing one connection pool.
#[derive(Clone)]
pub struct AsyncHttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl AsyncHttpTransport {
    pub fn new(config: &ServerConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: config.base_url(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AsyncTransport for AsyncHttpTransport {
    async fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        trace!(method = %request.method, path = %request.path, "sending request");

        let mut builder = self.client.request(
            to_reqwest(request.method),
            format!("{}{}", self.base_url, request.path),
        );
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse::new(status, body))
    }
}
