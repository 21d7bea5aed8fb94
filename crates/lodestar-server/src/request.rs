//! Incoming requests

use crate::error::{ServerError, ServerResult};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Header carrying the authenticated user id, set by the fronting
/// authentication layer
pub const USER_HEADER: &str = "x-user-id";

/// A fully read HTTP request plus the parameters its route captured
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub remote_addr: Option<SocketAddr>,
	params: HashMap<String, String>,
}

impl Request {
	pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
		Self {
			method,
			uri,
			headers,
			body,
			remote_addr: None,
			params: HashMap::new(),
		}
	}

	/// Add a header, ignoring values that aren't valid header text
	///
	/// ```
	/// use lodestar_server::Request;
	///
	/// let request = Request::new(http::Method::GET, "/".parse().unwrap(), Default::default(), Default::default())
	///     .with_header("x-user-id", "7");
	/// assert_eq!(request.user_id(), Some(7));
	/// ```
	pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(value) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// A captured route parameter
	pub fn param(&self, name: &str) -> ServerResult<&str> {
		self.params
			.get(name)
			.map(String::as_str)
			.ok_or_else(|| ServerError::BadRequest(format!("missing parameter '{name}'")))
	}

	pub fn param_i64(&self, name: &str) -> ServerResult<i64> {
		let raw = self.param(name)?;
		raw.parse()
			.map_err(|_| ServerError::BadRequest(format!("parameter '{name}' must be an integer")))
	}

	pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
		self.params = params;
	}

	/// Decode the query string
	pub fn query<T: DeserializeOwned>(&self) -> ServerResult<T> {
		serde_urlencoded::from_str(self.uri.query().unwrap_or(""))
			.map_err(|e| ServerError::BadRequest(format!("invalid query string: {e}")))
	}

	/// Decode a JSON body
	pub fn json<T: DeserializeOwned>(&self) -> ServerResult<T> {
		serde_json::from_slice(&self.body)
			.map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
	}

	/// The acting user, if the request carries a valid user header
	pub fn user_id(&self) -> Option<i64> {
		self.headers
			.get(USER_HEADER)?
			.to_str()
			.ok()?
			.trim()
			.parse()
			.ok()
	}
}
