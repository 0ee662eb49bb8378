use async_trait::async_trait;

use crate::{
    api::{ApiRequest, ApiResponse},
    client::ClientResult,
};

/// Delivers a request and waits for the response on the calling thread.
///
/// A non-success status is still `Ok`; only failures to exchange the
/// request at all are errors here.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse>;
}

/// Non-blocking counterpart of [`Transport`].
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse>;
}
