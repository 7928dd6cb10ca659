use std::path::PathBuf;

/// Failures raised while finding and parsing configuration fragments.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
	#[error("Failed to read config file: {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Failed to parse config file: {path}")]
	Toml {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid config file {path}: {reason}")]
	InvalidFragment { path: PathBuf, reason: String },
}

/// Library-level structured errors.
///
/// The CLI binary wraps these with `anyhow` for context chains.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),

	#[error("Invalid `libs` format for library `{name}`")]
	InvalidLibraryDeclaration { name: String },

	#[error("Library {name} was not found at {}", path.display())]
	LibraryNotFound { name: String, path: PathBuf },

	#[error("Cyclic set reference: {}", cycle.join(" -> "))]
	CyclicSetReference { cycle: Vec<String> },

	#[error("Invalid chunk in set `{set}`: {reason}")]
	InvalidSetChunk { set: String, reason: String },

	#[error("Failed to resolve current directory")]
	CurrentDirectory {
		#[source]
		source: std::io::Error,
	},
}

/// Result type alias using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;
