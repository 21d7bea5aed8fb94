//! The request handler abstraction

use crate::error::ServerResult;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Anything that turns a request into a response
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> ServerResult<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> ServerResult<Response> {
		(**self).handle(request).await
	}
}

/// Handler backed by an async function
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = ServerResult<Response>> + Send,
{
	async fn handle(&self, request: Request) -> ServerResult<Response> {
		(self.0)(request).await
	}
}

/// Wrap an async function as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = ServerResult<Response>> + Send,
{
	FnHandler(f)
}

/// Wrap an async view taking shared state as a [`Handler`]
pub fn with_state<S, F, Fut>(
	state: Arc<S>,
	view: F,
) -> FnHandler<impl Fn(Request) -> Fut + Send + Sync>
where
	S: Send + Sync + 'static,
	F: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ServerResult<Response>> + Send,
{
	FnHandler(move |request| view(state.clone(), request))
}
