//! Registry error taxonomy.
//!
//! Every variant except [`Error::Builder`] describes a composition defect
//! (bad declarations, missing builders, lifecycle misuse). None of them is
//! retried; they abort the `register`, `start` or `build` call that raised them.

/// Boxed error produced by builders and discovery futures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registry result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Two addins on the same path declare the same id.
	#[error("duplicate addin id {id:?} on path {path:?}")]
	DuplicateId { path: String, id: String },

	/// Relative orders on a path reference each other in a loop.
	#[error("order cycle on path {path:?}: {}", .members.join(" -> "))]
	OrderCycle { path: String, members: Vec<String> },

	/// A relative order names an id that is not declared on the same path.
	#[error("addin {addin} on path {path:?} is ordered after unknown id {target:?}")]
	UnresolvedReference { path: String, addin: String, target: String },

	/// An order expression could not be parsed.
	#[error("invalid order expression {expr:?}: {reason}")]
	InvalidOrder { expr: String, reason: &'static str },

	#[error("a builder is already registered for type {kind:?}")]
	DuplicateBuilder { kind: String },

	#[error("no builder registered for type {kind:?}")]
	UnknownType { kind: String },

	/// Two static modules were submitted under the same name.
	#[error("duplicate module name {name:?}")]
	DuplicateModule { name: &'static str },

	#[error("{operation} is not allowed once the engine has started")]
	AlreadyStarted { operation: &'static str },

	#[error("{operation} requires a started engine")]
	NotReady { operation: &'static str },

	/// A builder asked for a path that is already being composed further up.
	#[error("recursive composition cycle: {}", .chain.join(" -> "))]
	PathCycle { chain: Vec<String> },

	/// The discovery future handed to `start_after` failed.
	#[error("declaration discovery failed")]
	Discovery {
		#[source]
		source: BoxError,
	},

	/// A builder failed for its own reasons. The original error is kept as the source.
	#[error("builder for type {kind:?} failed")]
	Builder {
		kind: String,
		#[source]
		source: BoxError,
	},
}

impl Error {
	/// Wraps a builder-internal failure for the addin type `kind`.
	pub fn builder(kind: impl Into<String>, source: impl Into<BoxError>) -> Self {
		Self::Builder {
			kind: kind.into(),
			source: source.into(),
		}
	}

	/// Returns true for errors raised by the engine itself rather than by a builder.
	pub fn is_composition_defect(&self) -> bool {
		!matches!(self, Self::Builder { .. } | Self::Discovery { .. })
	}
}
