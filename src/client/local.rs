//! In-process transports that hand requests straight to a [`Router`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

use crate::{
    api::{ApiRequest, ApiResponse, Router},
    client::{AsyncTransport, ClientResult, Transport},
    error::Result,
    service::CardService,
    storage::Storage,
};

pub struct LocalTransport<S: Storage> {
    router: Arc<Router<S>>,
}

impl<S: Storage> LocalTransport<S> {
    pub fn new(service: CardService<S>) -> Self {
        Self::from_router(Arc::new(Router::new(service)))
    }

    pub fn from_router(router: Arc<Router<S>>) -> Self {
        Self { router }
    }
}

impl<S: Storage> Clone for LocalTransport<S> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
        }
    }
}

#[async_trait]
impl<S: Storage> AsyncTransport for LocalTransport<S> {
    async fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        Ok(self.router.handle(request).await)
    }
}

/// Drives the router on a private current-thread runtime. Must not be used
/// from inside another runtime.
pub struct BlockingLocalTransport<S: Storage> {
    router: Arc<Router<S>>,
    runtime: Runtime,
}

impl<S: Storage> BlockingLocalTransport<S> {
    pub fn new(service: CardService<S>) -> Result<Self> {
        Self::from_router(Arc::new(Router::new(service)))
    }

    pub fn from_router(router: Arc<Router<S>>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { router, runtime })
    }
}

impl<S: Storage> Transport for BlockingLocalTransport<S> {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        Ok(self.runtime.block_on(self.router.handle(request)))
    }
}
