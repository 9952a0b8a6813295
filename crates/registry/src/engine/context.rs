use std::cell::RefCell;
use std::sync::Arc;

use super::Engine;
use crate::addin::Addin;
use crate::builders::Builder;
use crate::error::{Error, Result};

thread_local! {
	/// Paths being composed on this thread, innermost last, tagged with their engine.
	static COMPOSING: RefCell<Vec<(usize, Box<str>)>> = const { RefCell::new(Vec::new()) };
}

fn engine_key<A>(engine: &Engine<A>) -> usize {
	std::ptr::from_ref(engine).addr()
}

/// Marks a path as being composed on this thread until dropped.
///
/// Catches builders that reach the engine some other way than through their
/// context chain (a captured handle, [`BuildContext::engine`]) and start a
/// fresh top-level build of a path further up the stack.
struct Composing;

impl Composing {
	fn enter<A>(engine: &Engine<A>, path: &str) -> Result<Self> {
		let key = engine_key(engine);
		COMPOSING.with_borrow_mut(|stack| {
			if stack.iter().any(|(owner, active)| *owner == key && &**active == path) {
				let mut chain: Vec<String> = stack
					.iter()
					.filter(|(owner, _)| *owner == key)
					.map(|(_, active)| active.to_string())
					.collect();
				chain.push(path.to_string());
				return Err(Error::PathCycle { chain });
			}
			stack.push((key, Box::from(path)));
			Ok(Self)
		})
	}
}

impl Drop for Composing {
	fn drop(&mut self) {
		COMPOSING.with_borrow_mut(|stack| {
			stack.pop();
		});
	}
}

/// Handle passed to builders while a path is being composed.
///
/// Contexts form a chain from the top-level `build` call down to the path
/// currently being composed. Nested builds go through [`BuildContext::build`],
/// which refuses to re-enter a path that is already on the chain. A path that
/// is still being composed on the current thread cannot be entered again
/// through [`Engine::build`] either.
pub struct BuildContext<'a, A> {
	engine: &'a Engine<A>,
	path: &'a str,
	parent: Option<&'a BuildContext<'a, A>>,
}

impl<'a, A> BuildContext<'a, A> {
	pub(crate) fn root(engine: &'a Engine<A>, path: &'a str) -> Self {
		Self {
			engine,
			path,
			parent: None,
		}
	}

	pub fn engine(&self) -> &'a Engine<A> {
		self.engine
	}

	/// Path whose addins are being built.
	pub fn path(&self) -> &'a str {
		self.path
	}

	/// Nesting level; the top-level `build` call is depth 0.
	pub fn depth(&self) -> usize {
		let mut depth = 0;
		let mut cur = self.parent;
		while let Some(cx) = cur {
			depth += 1;
			cur = cx.parent;
		}
		depth
	}

	/// Paths from the top-level build down to this one.
	pub fn chain(&self) -> Vec<&'a str> {
		let mut chain = vec![self.path];
		let mut cur = self.parent;
		while let Some(cx) = cur {
			chain.push(cx.path);
			cur = cx.parent;
		}
		chain.reverse();
		chain
	}

	/// Composes `path` as a child of this context.
	pub fn build(&self, path: &str) -> Result<Vec<A>> {
		let chain = self.chain();
		if chain.iter().any(|p| *p == path) {
			let mut chain: Vec<String> = chain.into_iter().map(str::to_string).collect();
			chain.push(path.to_string());
			return Err(Error::PathCycle { chain });
		}

		BuildContext {
			engine: self.engine,
			path,
			parent: Some(self),
		}
		.compose()
	}

	/// Resolved addins of any path, for builders that dispatch addin by addin.
	pub fn addins(&self, path: &str) -> Result<Vec<Arc<Addin>>> {
		self.engine.addins(path)
	}

	pub fn builder(&self, kind: &str) -> Result<Arc<dyn Builder<A>>> {
		self.engine.builder(kind)
	}

	/// Runs the builder registered for `addin`'s type within this context.
	pub fn build_addin(&self, addin: &Addin) -> Result<A> {
		self.engine.builder(addin.kind())?.build(addin, self)
	}

	/// Resolves this context's path and runs every addin through its builder.
	///
	/// All builders are looked up before the first one runs, so an unknown type
	/// leaves no partially built artifacts behind.
	pub(crate) fn compose(&self) -> Result<Vec<A>> {
		let _composing = Composing::enter(self.engine, self.path)?;
		let addins = self.engine.addins(self.path)?;
		let builders = addins
			.iter()
			.map(|addin| self.engine.builder(addin.kind()))
			.collect::<Result<Vec<_>>>()?;

		tracing::trace!(path = self.path, depth = self.depth(), count = addins.len(), "composing path");

		addins
			.iter()
			.zip(builders)
			.map(|(addin, builder)| builder.build(addin, self))
			.collect()
	}
}
