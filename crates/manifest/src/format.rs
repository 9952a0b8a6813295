use std::path::Path;

use serde::{Deserialize, Serialize};
use subdivision_registry::Declaration;

use crate::error::{ManifestError, Result};

/// On-disk manifest encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
	Toml,
	Json,
}

impl Format {
	pub fn from_path(path: &Path) -> Option<Self> {
		match path.extension()?.to_str()? {
			"toml" => Some(Self::Toml),
			"json" => Some(Self::Json),
			_ => None,
		}
	}

	/// Parses `content`; `path` only labels errors.
	pub fn parse(self, path: &Path, content: &str) -> Result<Manifest> {
		match self {
			Self::Toml => toml::from_str(content).map_err(|source| ManifestError::Toml {
				path: path.to_path_buf(),
				source,
			}),
			Self::Json => serde_json::from_str(content).map_err(|source| ManifestError::Json {
				path: path.to_path_buf(),
				source,
			}),
		}
	}
}

/// Contents of one manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
	#[serde(default)]
	pub paths: Vec<Declaration>,
}

impl Manifest {
	pub fn addin_count(&self) -> usize {
		self.paths.iter().map(|declaration| declaration.addins.len()).sum()
	}
}

/// Reads and parses a single manifest file.
pub fn read(path: &Path) -> Result<Manifest> {
	let format = Format::from_path(path).ok_or_else(|| ManifestError::UnsupportedFormat { path: path.to_path_buf() })?;
	let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	format.parse(path, &content)
}
