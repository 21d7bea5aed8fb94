//! The hyper HTTP/1 server loop

use crate::error::ServerError;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};

/// Default maximum request body size (10 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// HTTP server dispatching every request to one handler
pub struct HttpServer {
	handler: Arc<dyn Handler>,
	max_body_size: usize,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			max_body_size: DEFAULT_MAX_BODY_SIZE,
		}
	}

	/// Answer 413 to requests whose body is larger than `bytes`
	pub fn with_max_body_size(mut self, bytes: usize) -> Self {
		self.max_body_size = bytes;
		self
	}

	/// Bind `addr` and serve until `shutdown` resolves
	pub async fn listen(
		self,
		addr: SocketAddr,
		shutdown: impl Future<Output = ()>,
	) -> std::io::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		self.serve(listener, shutdown).await
	}

	/// Accept connections on `listener` until `shutdown` resolves
	///
	/// Connections already accepted keep running on their own tasks.
	pub async fn serve(
		self,
		listener: TcpListener,
		shutdown: impl Future<Output = ()>,
	) -> std::io::Result<()> {
		let local = listener.local_addr()?;
		tracing::info!(addr = %local, "server listening");
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				accepted = listener.accept() => {
					let (stream, remote_addr) = match accepted {
						Ok(conn) => conn,
						Err(e) => {
							tracing::warn!(error = %e, "failed to accept connection");
							continue;
						}
					};
					let service = RequestService {
						handler: self.handler.clone(),
						remote_addr,
						max_body_size: self.max_body_size,
					};
					tokio::spawn(async move {
						if let Err(e) = Self::handle_connection(stream, service).await {
							tracing::debug!(remote = %remote_addr, error = %e, "connection closed with error");
						}
					});
				}
				_ = &mut shutdown => {
					tracing::info!("shutdown signal received, no longer accepting connections");
					break;
				}
			}
		}
		Ok(())
	}

	async fn handle_connection(stream: TcpStream, service: RequestService) -> Result<(), hyper::Error> {
		let io = TokioIo::new(stream);
		http1::Builder::new().serve_connection(io, service).await
	}
}

struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
	max_body_size: usize,
}

/// Declared length larger than `limit`
fn declared_too_large(headers: &http::HeaderMap, limit: usize) -> bool {
	headers
		.get(http::header::CONTENT_LENGTH)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.parse::<u64>().ok())
		.is_some_and(|len| len > limit as u64)
}

fn into_hyper(response: Response) -> Result<hyper::Response<Full<Bytes>>, http::Error> {
	let mut builder = hyper::Response::builder().status(response.status);
	for (key, value) in response.headers.iter() {
		builder = builder.header(key, value);
	}
	builder.body(Full::new(response.body))
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Box<dyn std::error::Error + Send + Sync>;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;
		let max_body_size = self.max_body_size;

		Box::pin(async move {
			let started = Instant::now();
			let method = req.method().clone();
			let path = req.uri().path().to_string();

			let response = match read_request(req, remote_addr, max_body_size).await? {
				Ok(request) => handler
					.handle(request)
					.await
					.unwrap_or_else(|e| e.into_response()),
				Err(e) => {
					tracing::warn!(%method, path = %path, remote = %remote_addr, error = %e, "request rejected");
					e.into_response()
				}
			};

			tracing::info!(
				%method,
				path = %path,
				status = response.status.as_u16(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"request handled"
			);

			Ok(into_hyper(response)?)
		})
	}
}

/// Buffer the body, at most `limit` bytes of it
///
/// The outer error is a transport failure; the inner one a request to answer
/// with an error response.
async fn read_request(
	req: hyper::Request<Incoming>,
	remote_addr: SocketAddr,
	limit: usize,
) -> Result<Result<Request, ServerError>, Box<dyn std::error::Error + Send + Sync>> {
	let too_large = ServerError::PayloadTooLarge { limit };
	if declared_too_large(req.headers(), limit) {
		return Ok(Err(too_large));
	}

	let (parts, body) = req.into_parts();
	let body = match Limited::new(body, limit).collect().await {
		Ok(collected) => collected.to_bytes(),
		Err(e) if e.is::<LengthLimitError>() => return Ok(Err(too_large)),
		Err(e) => return Err(e),
	};

	let mut request = Request::new(parts.method, parts.uri, parts.headers, body);
	request.remote_addr = Some(remote_addr);
	Ok(Ok(request))
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
}
