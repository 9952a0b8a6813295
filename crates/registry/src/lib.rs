//! Addin composition engine.
//!
//! Independent modules declare typed *addins* under logical paths, optionally
//! ordered relative to one another. Builders registered per addin type turn
//! the ordered addins of a path into artifacts, composing nested paths into
//! trees where needed.
//!
//! # Modules
//!
//! - [`addin`] - Addin, payload and declaration group types
//! - [`store`] - Path → addins storage for the load phase, frozen at start
//! - [`order`] - Order expressions and graph-based order resolution
//! - [`builders`] - Builder trait and the type → builder table
//! - [`engine`] - Registration, lifecycle and recursive builds
//! - [`lifecycle`] - The `NotReady → Ready` gate
//! - [`module`] - `inventory`-collected static modules

pub mod addin;
pub mod builders;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod module;
pub mod order;
pub mod store;

pub use addin::{Addin, Declaration, Payload};
pub use builders::{Builder, BuilderTable, FnBuilder};
pub use engine::{BuildContext, Engine};
pub use error::{BoxError, Error, Result};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use module::{ModuleDef, modules};
pub use order::{Order, SortKey};
pub use store::{DeclarationStore, FrozenStore};
#[doc(hidden)]
pub use inventory;
