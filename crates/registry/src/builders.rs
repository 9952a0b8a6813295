//! Builder capabilities keyed by addin type.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;

use crate::addin::Addin;
use crate::engine::BuildContext;
use crate::error::{Error, Result};

/// Turns one addin into one artifact.
///
/// Container builders call [`BuildContext::build`] to compose a nested path
/// and weave the returned artifacts into their own.
pub trait Builder<A>: Send + Sync {
	fn build(&self, addin: &Addin, cx: &BuildContext<'_, A>) -> Result<A>;
}

/// Adapts a closure into a [`Builder`].
pub struct FnBuilder<F>(pub F);

impl<A, F> Builder<A> for FnBuilder<F>
where
	F: Fn(&Addin, &BuildContext<'_, A>) -> Result<A> + Send + Sync,
{
	fn build(&self, addin: &Addin, cx: &BuildContext<'_, A>) -> Result<A> {
		(self.0)(addin, cx)
	}
}

type Table<A> = HashMap<Box<str>, Arc<dyn Builder<A>>>;

/// One-to-one type → builder mapping.
///
/// Reads load the current table without locking; registration publishes a new
/// table through a compare-and-swap loop, so it may race with builds safely.
pub struct BuilderTable<A> {
	table: ArcSwap<Table<A>>,
}

impl<A> Default for BuilderTable<A> {
	fn default() -> Self {
		Self {
			table: ArcSwap::from_pointee(HashMap::default()),
		}
	}
}

impl<A> BuilderTable<A> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, kind: &str, builder: Arc<dyn Builder<A>>) -> Result<()> {
		loop {
			let current = self.table.load_full();
			if current.contains_key(kind) {
				return Err(Error::DuplicateBuilder { kind: kind.to_string() });
			}

			let mut next: Table<A> = (*current).clone();
			next.insert(Box::from(kind), Arc::clone(&builder));

			let prev = self.table.compare_and_swap(&current, Arc::new(next));
			if Arc::ptr_eq(&prev, &current) {
				tracing::debug!(kind, "registered builder");
				return Ok(());
			}
		}
	}

	pub fn get(&self, kind: &str) -> Result<Arc<dyn Builder<A>>> {
		self.table
			.load()
			.get(kind)
			.cloned()
			.ok_or_else(|| Error::UnknownType { kind: kind.to_string() })
	}

	pub fn contains(&self, kind: &str) -> bool {
		self.table.load().contains_key(kind)
	}

	/// Registered types, sorted.
	pub fn kinds(&self) -> Vec<String> {
		let mut kinds: Vec<String> = self.table.load().keys().map(|k| k.to_string()).collect();
		kinds.sort_unstable();
		kinds
	}

	pub fn len(&self) -> usize {
		self.table.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
