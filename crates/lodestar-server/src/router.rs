//! Method and path routing
//!
//! Patterns are `/`-separated segments: literals, `{name}` capturing one
//! segment, or a final `{name..}` capturing the rest of the path.

use crate::error::{ServerError, ServerResult};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
	Rest(String),
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
	pattern
		.split('/')
		.filter(|s| !s.is_empty())
		.map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
			Some(name) => match name.strip_suffix("..") {
				Some(rest) => Segment::Rest(rest.to_string()),
				None => Segment::Param(name.to_string()),
			},
			None => Segment::Literal(s.to_string()),
		})
		.collect()
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> Option<HashMap<String, String>> {
	let mut params = HashMap::new();
	for (i, segment) in pattern.iter().enumerate() {
		match segment {
			Segment::Rest(name) => {
				params.insert(name.clone(), path.get(i..).unwrap_or_default().join("/"));
				return Some(params);
			}
			Segment::Literal(literal) => {
				if path.get(i) != Some(&literal.as_str()) {
					return None;
				}
			}
			Segment::Param(name) => {
				let value = path.get(i)?;
				params.insert(name.clone(), (*value).to_string());
			}
		}
	}
	(pattern.len() == path.len()).then_some(params)
}

struct Route {
	method: Method,
	pattern: Vec<Segment>,
	handler: Arc<dyn Handler>,
}

/// Dispatches to the first route whose method and pattern match
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn route(mut self, method: Method, pattern: &str, handler: impl Handler + 'static) -> Self {
		self.routes.push(Route {
			method,
			pattern: parse_pattern(pattern),
			handler: Arc::new(handler),
		});
		self
	}

	pub fn get(self, pattern: &str, handler: impl Handler + 'static) -> Self {
		self.route(Method::GET, pattern, handler)
	}

	pub fn post(self, pattern: &str, handler: impl Handler + 'static) -> Self {
		self.route(Method::POST, pattern, handler)
	}

	pub fn put(self, pattern: &str, handler: impl Handler + 'static) -> Self {
		self.route(Method::PUT, pattern, handler)
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> ServerResult<Response> {
		let path = request.path().to_string();
		let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

		let mut path_matched = false;
		for route in &self.routes {
			let Some(params) = match_segments(&route.pattern, &segments) else {
				continue;
			};
			if route.method != request.method {
				path_matched = true;
				continue;
			}
			request.set_params(params);
			return route.handler.handle(request).await;
		}

		if path_matched {
			Err(ServerError::MethodNotAllowed)
		} else {
			Err(ServerError::NotFound(path))
		}
	}
}
