//! Outgoing responses

use crate::error::ServerResult;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn created() -> Self {
		Self::new(StatusCode::CREATED)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Permanent redirect to `location`
	pub fn moved_permanently(location: &str) -> ServerResult<Self> {
		Self::new(StatusCode::MOVED_PERMANENTLY).with_location(location)
	}

	/// Fails when `location` cannot be sent as a header value
	pub fn with_location(mut self, location: &str) -> ServerResult<Self> {
		let value = HeaderValue::from_str(location).map_err(http::Error::from)?;
		self.headers.insert(LOCATION, value);
		Ok(self)
	}

	/// Set the body to serialised JSON
	pub fn with_json<T: Serialize>(mut self, data: &T) -> ServerResult<Self> {
		self.body = Bytes::from(serde_json::to_vec(data)?);
		self.headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		Ok(self)
	}

	/// Set the body to an already built JSON value
	pub fn with_json_value(mut self, value: &serde_json::Value) -> Self {
		self.body = Bytes::from(value.to_string());
		self.headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self
	}

	pub fn with_html(mut self, html: impl Into<String>) -> Self {
		self.body = Bytes::from(html.into());
		self.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("text/html; charset=utf-8"),
		);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_json_sets_content_type() {
		let response = Response::ok()
			.with_json(&serde_json::json!({"allowed": true}))
			.unwrap();
		assert_eq!(response.headers[CONTENT_TYPE], "application/json");
		assert_eq!(&response.body[..], br#"{"allowed":true}"#);
	}

	#[test]
	fn test_redirect_location() {
		let response = Response::moved_permanently("/docs/install").unwrap();
		assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
		assert_eq!(response.headers[LOCATION], "/docs/install");
	}

	#[test]
	fn test_unsendable_location_is_an_error() {
		let result = Response::moved_permanently("/docs\r\nSet-Cookie: x=1");
		assert!(matches!(result, Err(crate::error::ServerError::Http(_))));
	}
}
