//! Manifest discovery under a root directory.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use subdivision_registry::Declaration;

use crate::error::{ManifestError, Result};
use crate::format;

/// Patterns used when a loader is given none.
pub const DEFAULT_PATTERNS: &[&str] = &["**/manifest.toml", "**/manifest.json"];

/// Aggregate result of loading every manifest under a root.
#[derive(Debug, Default)]
pub struct ManifestLoadReport {
	/// Declarations of every manifest that loaded, in file order.
	pub declarations: Vec<Declaration>,
	/// Files that loaded successfully.
	pub sources: Vec<PathBuf>,
	/// Per-file failures. A failing file contributes no declarations.
	pub errors: Vec<(PathBuf, ManifestError)>,
}

impl ManifestLoadReport {
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}

	/// Returns the declarations, or fails if any file failed to load.
	pub fn into_declarations(self) -> Result<Vec<Declaration>> {
		let mut errors: Vec<ManifestError> = self.errors.into_iter().map(|(_, err)| err).collect();
		match errors.len() {
			0 => Ok(self.declarations),
			1 => Err(errors.remove(0)),
			_ => Err(ManifestError::Multiple(errors)),
		}
	}
}

/// Finds manifest files below `root` whose root-relative path matches one of `patterns`.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
	root: PathBuf,
	patterns: Vec<String>,
}

impl ManifestLoader {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			patterns: Vec::new(),
		}
	}

	pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
		self.patterns.push(pattern.into());
		self
	}

	pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.patterns.extend(patterns.into_iter().map(Into::into));
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Configured patterns, or [`DEFAULT_PATTERNS`] when none were given.
	pub fn patterns(&self) -> Vec<&str> {
		if self.patterns.is_empty() {
			DEFAULT_PATTERNS.to_vec()
		} else {
			self.patterns.iter().map(String::as_str).collect()
		}
	}

	fn glob_set(&self) -> Result<GlobSet> {
		let mut builder = GlobSetBuilder::new();
		for pattern in self.patterns() {
			builder.add(Glob::new(pattern)?);
		}
		Ok(builder.build()?)
	}

	/// Matching files, sorted by path.
	///
	/// Hidden and ignored files are not skipped: manifests are matched by pattern alone.
	pub fn discover(&self) -> Result<Vec<PathBuf>> {
		let globs = self.glob_set()?;
		let walker = WalkBuilder::new(&self.root)
			.standard_filters(false)
			.follow_links(false)
			.build();

		let mut found = Vec::new();
		for entry in walker {
			let entry = entry?;
			if !entry.file_type().is_some_and(|ty| ty.is_file()) {
				continue;
			}
			let path = entry.into_path();
			let relative = path.strip_prefix(&self.root).unwrap_or(&path);
			if globs.is_match(relative) {
				found.push(path);
			}
		}
		found.sort();
		Ok(found)
	}

	/// Loads every discovered manifest. Failing files are reported without
	/// affecting the others.
	pub fn load(&self) -> ManifestLoadReport {
		let mut report = ManifestLoadReport::default();

		let files = match self.discover() {
			Ok(files) => files,
			Err(err) => {
				tracing::warn!(root = %self.root.display(), error = %err, "manifest discovery failed");
				report.errors.push((self.root.clone(), err));
				return report;
			}
		};

		for path in files {
			match format::read(&path) {
				Ok(manifest) => {
					tracing::debug!(
						file = %path.display(),
						groups = manifest.paths.len(),
						addins = manifest.addin_count(),
						"loaded manifest"
					);
					report.declarations.extend(manifest.paths);
					report.sources.push(path);
				}
				Err(err) => {
					tracing::warn!(file = %path.display(), error = %err, "failed to load manifest");
					report.errors.push((path, err));
				}
			}
		}

		report
	}
}
