//! Ordered layers of routes, middleware and mounted routers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::RouterError;
use crate::handler::{Flow, Handler, Request, Response};

/// Route verb. `Use` registers middleware matching every method under a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
	Get,
	Post,
	Put,
	Patch,
	Delete,
	Use,
}

impl Verb {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Get => "get",
			Self::Post => "post",
			Self::Put => "put",
			Self::Patch => "patch",
			Self::Delete => "delete",
			Self::Use => "use",
		}
	}

	fn matches_method(self, method: &str) -> bool {
		self == Self::Use || self.as_str().eq_ignore_ascii_case(method)
	}
}

impl FromStr for Verb {
	type Err = RouterError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"get" => Ok(Self::Get),
			"post" => Ok(Self::Post),
			"put" => Ok(Self::Put),
			"patch" => Ok(Self::Patch),
			"delete" => Ok(Self::Delete),
			"use" => Ok(Self::Use),
			_ => Err(RouterError::InvalidVerb { verb: s.to_string() }),
		}
	}
}

impl fmt::Display for Verb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for Verb {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

/// A linked route: verb, path pattern and the handler it dispatches to.
#[derive(Clone)]
pub struct Route {
	pub verb: Verb,
	pub pattern: String,
	/// Name the handler was linked by, kept for listings.
	pub handler_name: String,
	pub handler: Handler,
}

impl Route {
	pub fn new(verb: Verb, pattern: &str, handler_name: &str, handler: Handler) -> Self {
		Self {
			verb,
			pattern: normalize(pattern),
			handler_name: handler_name.to_string(),
			handler,
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("verb", &self.verb)
			.field("pattern", &self.pattern)
			.field("handler", &self.handler_name)
			.finish()
	}
}

/// A router mounted under a prefix.
#[derive(Debug, Clone)]
pub struct Mount {
	pub prefix: String,
	pub router: Router,
}

impl Mount {
	pub fn new(prefix: &str, router: Router) -> Self {
		Self {
			prefix: normalize(prefix),
			router,
		}
	}
}

/// Output of the router builders.
#[derive(Debug, Clone)]
pub enum Artifact {
	Route(Route),
	Mount(Mount),
}

#[derive(Debug, Clone, Default)]
pub struct Router {
	layers: Vec<Artifact>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stacks artifacts in the order given, typically the resolved order of a path.
	pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
		Self {
			layers: artifacts.into_iter().collect(),
		}
	}

	pub fn push(&mut self, artifact: Artifact) {
		self.layers.push(artifact);
	}

	pub fn route(&mut self, verb: Verb, pattern: &str, name: &str, handler: Handler) {
		self.push(Artifact::Route(Route::new(verb, pattern, name, handler)));
	}

	pub fn mount(&mut self, prefix: &str, router: Router) {
		self.push(Artifact::Mount(Mount::new(prefix, router)));
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// Flattened `VERB /full/path -> handler` lines in dispatch order.
	pub fn routes(&self) -> Vec<String> {
		let mut out = Vec::new();
		self.collect_routes("/", &mut out);
		out
	}

	fn collect_routes(&self, prefix: &str, out: &mut Vec<String>) {
		for layer in &self.layers {
			match layer {
				Artifact::Route(route) => {
					out.push(format!(
						"{} {} -> {}",
						route.verb.as_str().to_ascii_uppercase(),
						join(prefix, &route.pattern),
						route.handler_name
					));
				}
				Artifact::Mount(mount) => mount.router.collect_routes(&join(prefix, &mount.prefix), out),
			}
		}
	}

	/// Runs `request` through the layers. Unanswered requests get a 404.
	pub fn dispatch(&self, request: &Request) -> Response {
		let mut response = Response::default();
		if !self.handle(request, &request.path, &mut response) {
			response.status = 404;
			response.body = format!("Cannot {} {}", request.method, request.path);
		}
		tracing::debug!(request = %request, status = response.status, "dispatched request");
		response
	}

	/// Returns true once a handler completed the response.
	fn handle(&self, request: &Request, path: &str, response: &mut Response) -> bool {
		for layer in &self.layers {
			match layer {
				Artifact::Route(route) => {
					let matched = match route.verb {
						Verb::Use => strip_prefix(&route.pattern, path).is_some(),
						verb => verb.matches_method(&request.method) && same_path(&route.pattern, path),
					};
					if matched && (route.handler)(request, response) == Flow::Done {
						return true;
					}
				}
				Artifact::Mount(mount) => {
					if let Some(rest) = strip_prefix(&mount.prefix, path)
						&& mount.router.handle(request, &rest, response)
					{
						return true;
					}
				}
			}
		}
		false
	}
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

fn normalize(path: &str) -> String {
	let joined: Vec<&str> = segments(path).collect();
	format!("/{}", joined.join("/"))
}

fn join(prefix: &str, path: &str) -> String {
	normalize(&format!("{prefix}/{path}"))
}

fn same_path(pattern: &str, path: &str) -> bool {
	segments(pattern).eq(segments(path))
}

/// The remainder of `path` below `prefix`, matching whole segments.
fn strip_prefix(prefix: &str, path: &str) -> Option<String> {
	let mut rest = segments(path);
	for expected in segments(prefix) {
		if rest.next() != Some(expected) {
			return None;
		}
	}
	let rest: Vec<&str> = rest.collect();
	Some(format!("/{}", rest.join("/")))
}
