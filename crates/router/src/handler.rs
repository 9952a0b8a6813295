use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::error::RouterError;

/// An incoming request: an upper-case method and an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub method: String,
	pub path: String,
}

impl Request {
	pub fn new(method: &str, path: &str) -> Self {
		let path = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
		Self {
			method: method.to_ascii_uppercase(),
			path,
		}
	}
}

impl FromStr for Request {
	type Err = RouterError;

	/// Parses a request line such as `GET /admin/log`.
	fn from_str(line: &str) -> Result<Self, Self::Err> {
		let mut parts = line.split_whitespace();
		match (parts.next(), parts.next(), parts.next()) {
			(Some(method), Some(path), None) => Ok(Self::new(method, path)),
			_ => Err(RouterError::InvalidRequest { line: line.to_string() }),
		}
	}
}

impl fmt::Display for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.method, self.path)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub status: u16,
	pub body: String,
	pub headers: Vec<(String, String)>,
}

impl Default for Response {
	fn default() -> Self {
		Self {
			status: 200,
			body: String::new(),
			headers: Vec::new(),
		}
	}
}

impl Response {
	pub fn send(&mut self, body: impl Into<String>) {
		self.body = body.into();
	}

	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.headers.push((name.into(), value.into()));
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().rev().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
	}
}

/// What a handler wants dispatch to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Continue with the next matching layer.
	Next,
	/// The response is complete.
	Done,
}

pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> Flow + Send + Sync>;

/// Named handlers that manifests refer to.
///
/// Functions cannot be declared in a manifest, so route addins carry a handler
/// name and the host links it against this table when the route is built.
#[derive(Default, Clone)]
pub struct HandlerTable {
	handlers: HashMap<String, Handler>,
}

impl HandlerTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert<F>(&mut self, name: impl Into<String>, handler: F) -> Result<(), RouterError>
	where
		F: Fn(&Request, &mut Response) -> Flow + Send + Sync + 'static,
	{
		let name = name.into();
		if self.handlers.contains_key(&name) {
			return Err(RouterError::DuplicateHandler { name });
		}
		self.handlers.insert(name, Arc::new(handler));
		Ok(())
	}

	/// Shorthand for a handler that answers with a fixed body.
	pub fn insert_text(&mut self, name: impl Into<String>, body: &'static str) -> Result<(), RouterError> {
		self.insert(name, move |_, res| {
			res.send(body);
			Flow::Done
		})
	}

	pub fn get(&self, name: &str) -> Result<Handler, RouterError> {
		self.handlers
			.get(name)
			.cloned()
			.ok_or_else(|| RouterError::UnknownHandler { name: name.to_string() })
	}

	/// Handler names, sorted.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}
}

impl fmt::Debug for HandlerTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerTable").field("names", &self.names()).finish()
	}
}
