//! Composition engine façade.
//!
//! # Mental Model
//!
//! 1. **Load phase:** modules register addins by path (directly, from
//!    [`crate::ModuleDef`]s, or from already-parsed manifests). Registration is
//!    serialized by a mutex and checked for duplicate ids.
//! 2. **Start:** [`Engine::start`] (or [`Engine::start_after`], which first awaits
//!    external discovery) freezes the store and flips the gate to ready. The
//!    frozen store is published once and read without locks afterwards.
//! 3. **Build phase:** host code registers builders and calls [`Engine::build`].
//!    Each call resolves the path's order afresh and dispatches every addin to
//!    its builder. Builders compose nested paths through [`BuildContext`].
//!
//! # Invariants
//!
//! - No registration after start; no build, lookup or resolution before it.
//!   - Enforced in: [`crate::lifecycle::Lifecycle`], checked by every public entry point.
//! - No partial application: order errors and unknown types fail before any builder runs.
//!   - Enforced in: [`BuildContext::compose`].
//! - Recursive composition terminates.
//!   - Enforced in: [`BuildContext::build`] for the context chain, and in
//!     composition itself for any path already being composed on the calling
//!     thread ([`crate::Error::PathCycle`]).

mod context;
#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::{Arc, OnceLock};

pub use context::BuildContext;
use parking_lot::Mutex;
use rustc_hash::FxHashSet as HashSet;

use crate::addin::{Addin, Declaration};
use crate::builders::{Builder, BuilderTable, FnBuilder};
use crate::error::{BoxError, Error, Result};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::module::modules;
use crate::order;
use crate::store::{DeclarationStore, FrozenStore};

/// Addin composition engine producing artifacts of type `A`.
pub struct Engine<A> {
	pending: Mutex<DeclarationStore>,
	frozen: OnceLock<FrozenStore>,
	builders: BuilderTable<A>,
	lifecycle: Lifecycle,
}

impl<A> Default for Engine<A> {
	fn default() -> Self {
		Self {
			pending: Mutex::new(DeclarationStore::new()),
			frozen: OnceLock::new(),
			builders: BuilderTable::new(),
			lifecycle: Lifecycle::new(),
		}
	}
}

impl<A> Engine<A> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> LifecycleState {
		self.lifecycle.state()
	}

	pub fn is_ready(&self) -> bool {
		self.lifecycle.is_ready()
	}

	/// Appends one addin to `path`. Only legal before start.
	pub fn register(&self, path: &str, addin: Addin) -> Result<()> {
		let mut pending = self.pending.lock();
		self.lifecycle.ensure_open("register")?;
		pending.register(path, addin)
	}

	/// Registers one declaration group atomically.
	pub fn register_declaration(&self, declaration: Declaration) -> Result<usize> {
		self.register_declarations([declaration])
	}

	/// Registers several groups; if any addin is rejected, nothing is registered.
	pub fn register_declarations(&self, declarations: impl IntoIterator<Item = Declaration>) -> Result<usize> {
		let mut pending = self.pending.lock();
		self.lifecycle.ensure_open("register")?;
		pending.register_batch(declarations.into_iter().collect())
	}

	/// Registers the declarations of every statically submitted [`crate::ModuleDef`].
	pub fn register_modules(&self) -> Result<usize> {
		let mut seen = HashSet::default();
		let mut declarations = Vec::new();
		for module in modules() {
			if !seen.insert(module.name) {
				return Err(Error::DuplicateModule { name: module.name });
			}
			let declared = (module.declare)();
			tracing::debug!(module = module.name, groups = declared.len(), "collected module declarations");
			declarations.extend(declared);
		}
		self.register_declarations(declarations)
	}

	/// Freezes the declarations and makes the engine ready. Fails on a second call.
	pub fn start(&self) -> Result<()> {
		let mut pending = self.pending.lock();
		self.lifecycle.begin_start()?;
		let store = std::mem::take(&mut *pending);
		self.publish(store);
		Ok(())
	}

	/// Awaits `discovery`, registers everything it yields, then starts.
	///
	/// While discovery is pending direct registration is rejected. If discovery
	/// fails, a discovered group is rejected, or the future is dropped, the
	/// engine returns to `NotReady` with its previous declarations intact.
	pub async fn start_after<F, E>(&self, discovery: F) -> Result<()>
	where
		F: Future<Output = std::result::Result<Vec<Declaration>, E>>,
		E: Into<BoxError>,
	{
		self.lifecycle.begin_start()?;
		let guard = StartGuard {
			lifecycle: &self.lifecycle,
			armed: true,
		};

		let declarations = discovery.await.map_err(|err| Error::Discovery { source: err.into() })?;

		let mut pending = self.pending.lock();
		let count = pending.register_batch(declarations)?;
		let store = std::mem::take(&mut *pending);
		tracing::debug!(addins = count, "registered discovered declarations");

		guard.disarm();
		self.publish(store);
		Ok(())
	}

	fn publish(&self, store: DeclarationStore) {
		let frozen = store.freeze();
		tracing::info!(
			paths = frozen.paths().len(),
			addins = frozen.len(),
			builders = self.builders.len(),
			"addin engine ready"
		);
		// begin_start admits exactly one caller, so the cell is still empty here.
		let _ = self.frozen.set(frozen);
		self.lifecycle.finish_start();
	}

	fn frozen(&self, operation: &'static str) -> Result<&FrozenStore> {
		self.lifecycle.ensure_ready(operation)?;
		self.frozen.get().ok_or(Error::NotReady { operation })
	}

	/// Registers the builder for `kind`. Allowed before and after start.
	pub fn add_builder<B>(&self, kind: &str, builder: B) -> Result<()>
	where
		B: Builder<A> + 'static,
	{
		self.builders.insert(kind, Arc::new(builder))
	}

	/// Registers a closure as the builder for `kind`.
	pub fn add_builder_fn<F>(&self, kind: &str, build: F) -> Result<()>
	where
		F: Fn(&Addin, &BuildContext<'_, A>) -> Result<A> + Send + Sync + 'static,
	{
		self.add_builder(kind, FnBuilder(build))
	}

	pub fn builder(&self, kind: &str) -> Result<Arc<dyn Builder<A>>> {
		self.lifecycle.ensure_ready("builder")?;
		self.builders.get(kind)
	}

	/// Registered builder types, sorted.
	pub fn builder_kinds(&self) -> Vec<String> {
		self.builders.kinds()
	}

	/// The ordered addins of `path`, resolved afresh.
	pub fn addins(&self, path: &str) -> Result<Vec<Arc<Addin>>> {
		order::resolve(path, self.frozen("addins")?.list(path))
	}

	/// Addins of `path` in registration order, without resolution.
	pub fn declared(&self, path: &str) -> Result<&[Arc<Addin>]> {
		Ok(self.frozen("declared")?.list(path))
	}

	/// Paths with at least one addin, sorted.
	pub fn paths(&self) -> Result<Vec<&str>> {
		Ok(self.frozen("paths")?.paths())
	}

	/// Builds every addin of `path` in resolved order. An empty path yields no artifacts.
	pub fn build(&self, path: &str) -> Result<Vec<A>> {
		self.lifecycle.ensure_ready("build")?;
		BuildContext::root(self, path).compose()
	}
}

/// Rolls an unfinished `start_after` back to `NotReady`.
struct StartGuard<'a> {
	lifecycle: &'a Lifecycle,
	armed: bool,
}

impl StartGuard<'_> {
	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for StartGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.lifecycle.abort_start();
		}
	}
}
