//! Addin manifests on disk.
//!
//! A manifest is a TOML or JSON file listing declaration groups:
//!
//! ```toml
//! [[paths]]
//! path = "Express/Routes"
//!
//! [[paths.addins]]
//! id = "verifyUser"
//! type = "Route"
//! verb = "use"
//! handler = "users.verify"
//! ```
//!
//! [`ManifestLoader`] finds manifests under a root directory by glob pattern
//! and parses them into [`subdivision_registry::Declaration`]s, which the host
//! hands to the engine. The engine itself never reads files.

mod error;
mod format;
mod loader;

pub use error::{ManifestError, Result};
pub use format::{Format, Manifest, read};
pub use loader::{DEFAULT_PATTERNS, ManifestLoadReport, ManifestLoader};
