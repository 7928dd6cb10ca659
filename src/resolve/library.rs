use crate::config::types::{EffectiveConfig, LIBS_KEY, LibraryDeclaration, Settings};
use crate::error::{ConfigError, Result};
use crate::probe::Probe;
use crate::resolve::level::resolve_path;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Directory libraries are installed into when no path is declared.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Validate a raw `libs` entry. `Ok(None)` if the library is not declared.
pub fn validate_library(name: &str, entry: Option<&Value>) -> Result<Option<LibraryDeclaration>> {
	let invalid = || ConfigError::InvalidLibraryDeclaration {
		name: name.to_string(),
	};

	let Some(entry) = entry else {
		return Ok(None);
	};
	let Value::Object(entry) = entry else {
		return Err(invalid());
	};

	let mut settings: Settings = entry.clone();
	let path = match settings.shift_remove("path") {
		None | Some(Value::Null) => None,
		Some(Value::String(path)) => Some(PathBuf::from(path)),
		Some(_) => return Err(invalid()),
	};

	Ok(Some(LibraryDeclaration { path, settings }))
}

/// Candidate install directory of a library.
///
/// A declared path is taken relative to `base`; otherwise the library is
/// expected under `<base>/node_modules/<name>`.
pub fn library_dir(name: &str, declaration: Option<&LibraryDeclaration>, base: &Path) -> PathBuf {
	match declaration.and_then(|declaration| declaration.path.as_deref()) {
		Some(path) => resolve_path(base, path),
		None => resolve_path(base, &Path::new(DEPENDENCY_DIR).join(name)),
	}
}

/// Find the directory of library `name` declared in `config`.
///
/// The library must be an existing directory: a regular file at that path is
/// reported as [`ConfigError::LibraryNotFound`] like a missing one.
pub async fn locate_library<P: Probe>(
	config: &EffectiveConfig,
	name: &str,
	base: &Path,
	probe: &P,
) -> Result<PathBuf> {
	let entry = config
		.settings()
		.get(LIBS_KEY)
		.and_then(Value::as_object)
		.and_then(|libs| libs.get(name));
	let declaration = validate_library(name, entry)?;
	let dir = library_dir(name, declaration.as_ref(), base);

	if !probe.is_dir(&dir).await {
		return Err(ConfigError::LibraryNotFound {
			name: name.to_string(),
			path: dir,
		});
	}

	tracing::debug!(library = name, dir = %dir.display(), "Located library");
	Ok(dir)
}
