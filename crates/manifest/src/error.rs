use std::path::PathBuf;

pub type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid TOML manifest {}: {source}", path.display())]
	Toml {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("invalid JSON manifest {}: {source}", path.display())]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("unsupported manifest format: {} (expected .toml or .json)", path.display())]
	UnsupportedFormat { path: PathBuf },
	#[error("invalid manifest pattern: {0}")]
	Pattern(#[from] globset::Error),
	#[error("failed to walk manifest directory: {0}")]
	Walk(#[from] ignore::Error),
	#[error("{} manifest files failed to load", .0.len())]
	Multiple(Vec<ManifestError>),
}
