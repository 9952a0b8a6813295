//! Addin declarations and their grouping by path.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::order::Order;

/// Builder-specific addin fields.
///
/// The engine never looks inside; builders read single fields with
/// [`Payload::get_str`] or deserialize a typed view with [`Addin::payload_as`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(Value::as_str)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.insert(key.into(), value.into());
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}
}

impl From<Map<String, Value>> for Payload {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

/// A single declared unit of extension attached to one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addin {
	/// Unique within the path. Only needed when another addin orders itself relative to this one.
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty_id")]
	pub id: Option<String>,
	/// Type tag selecting the builder.
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub order: Order,
	#[serde(flatten)]
	pub payload: Payload,
}

impl Addin {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			id: None,
			kind: kind.into(),
			order: Order::default(),
			payload: Payload::new(),
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		let id = id.into();
		self.id = (!id.is_empty()).then_some(id);
		self
	}

	pub fn with_order(mut self, order: impl Into<Order>) -> Self {
		self.order = order.into();
		self
	}

	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.payload.insert(key, value);
		self
	}

	/// Returns the id, treating an empty string as absent.
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref().filter(|id| !id.is_empty())
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// Deserializes the payload into a builder-specific view.
	pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		serde_json::from_value(Value::Object(self.payload.0.clone()))
	}

	/// Human-readable reference used in error messages: the id, or the position on its path.
	pub(crate) fn describe(&self, index: usize) -> String {
		match self.id() {
			Some(id) => id.to_string(),
			None => format!("#{index} ({})", self.kind),
		}
	}
}

fn non_empty_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let id = Option::<String>::deserialize(deserializer)?;
	Ok(id.filter(|id| !id.is_empty()))
}

/// A group of addins declared under one path by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
	pub path: String,
	#[serde(default)]
	pub addins: Vec<Addin>,
}

impl Declaration {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			addins: Vec::new(),
		}
	}

	pub fn with(mut self, addin: Addin) -> Self {
		self.addins.push(addin);
		self
	}
}
