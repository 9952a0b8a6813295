//! Declaration store: raw addins grouped by path.
//!
//! The mutable [`DeclarationStore`] accepts registrations during the load phase.
//! [`DeclarationStore::freeze`] turns it into a [`FrozenStore`] that the build
//! phase reads without locking.


use std::sync::Arc;

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::addin::{Addin, Declaration};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct PathEntries {
	addins: Vec<Arc<Addin>>,
	ids: HashSet<Box<str>>,
}

/// Append-only path → addins mapping for the load phase.
#[derive(Debug, Default)]
pub struct DeclarationStore {
	paths: HashMap<Box<str>, PathEntries>,
	total: usize,
}

impl DeclarationStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `addin` to `path`, rejecting a second addin with the same non-empty id.
	pub fn register(&mut self, path: &str, addin: Addin) -> Result<()> {
		let entries = self.paths.entry(Box::from(path)).or_default();
		if let Some(id) = addin.id()
			&& !entries.ids.insert(Box::from(id))
		{
			return Err(Error::DuplicateId {
				path: path.to_string(),
				id: id.to_string(),
			});
		}

		tracing::debug!(path, kind = addin.kind(), id = addin.id(), order = %addin.order, "registered addin");
		entries.addins.push(Arc::new(addin));
		self.total += 1;
		Ok(())
	}

	/// Registers a whole declaration group. Either every addin is inserted or none is.
	pub fn register_all(&mut self, declaration: Declaration) -> Result<usize> {
		self.register_batch(vec![declaration])
	}

	/// Registers several groups. Either every addin of every group is inserted or none is.
	pub fn register_batch(&mut self, declarations: Vec<Declaration>) -> Result<usize> {
		self.check_all(&declarations)?;

		let mut count = 0;
		for Declaration { path, addins } in declarations {
			count += addins.len();
			for addin in addins {
				self.register(&path, addin)?;
			}
		}
		Ok(count)
	}

	/// Fails with the first id that would collide, either with a registered
	/// addin or with an earlier addin of the same batch on the same path.
	pub fn check_all(&self, declarations: &[Declaration]) -> Result<()> {
		let mut incoming: HashMap<&str, HashSet<&str>> = HashMap::default();
		for Declaration { path, addins } in declarations {
			let existing = self.paths.get(path.as_str()).map(|entries| &entries.ids);
			let batch = incoming.entry(path.as_str()).or_default();
			for id in addins.iter().filter_map(Addin::id) {
				if existing.is_some_and(|ids| ids.contains(id)) || !batch.insert(id) {
					return Err(Error::DuplicateId {
						path: path.clone(),
						id: id.to_string(),
					});
				}
			}
		}
		Ok(())
	}

	/// Returns the addins of `path` in registration order (empty when unknown).
	pub fn list(&self, path: &str) -> &[Arc<Addin>] {
		self.paths.get(path).map(|entries| entries.addins.as_slice()).unwrap_or_default()
	}

	/// Known paths, sorted.
	pub fn paths(&self) -> Vec<&str> {
		let mut paths: Vec<&str> = self.paths.keys().map(AsRef::as_ref).collect();
		paths.sort_unstable();
		paths
	}

	/// Total number of registered addins across all paths.
	pub fn len(&self) -> usize {
		self.total
	}

	pub fn is_empty(&self) -> bool {
		self.total == 0
	}

	pub fn freeze(self) -> FrozenStore {
		FrozenStore {
			total: self.total,
			paths: self
				.paths
				.into_iter()
				.map(|(path, entries)| (path, entries.addins.into_boxed_slice()))
				.collect(),
		}
	}
}

/// Read-only store published when the engine starts.
#[derive(Debug, Default)]
pub struct FrozenStore {
	paths: HashMap<Box<str>, Box<[Arc<Addin>]>>,
	total: usize,
}

impl FrozenStore {
	pub fn list(&self, path: &str) -> &[Arc<Addin>] {
		self.paths.get(path).map(|addins| &addins[..]).unwrap_or_default()
	}

	pub fn paths(&self) -> Vec<&str> {
		let mut paths: Vec<&str> = self.paths.keys().map(AsRef::as_ref).collect();
		paths.sort_unstable();
		paths
	}

	pub fn len(&self) -> usize {
		self.total
	}

	pub fn is_empty(&self) -> bool {
		self.total == 0
	}
}
