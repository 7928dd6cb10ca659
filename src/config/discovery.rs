use crate::config::options::CascadeOptions;
use crate::config::parser::{FragmentFormat, fragment_from_settings, parse_fragment_str};
use crate::config::types::Fragment;
use crate::error::DiscoveryError;
use crate::probe::Probe;
use std::path::Path;

/// Discover and load all fragments of a cascade.
///
/// The cascade order is:
/// 1. If `path_to_config` is set, only that file (plus defaults)
/// 2. Otherwise start from `cwd` and look for `.<name>rc`, `.<name>rc.json`, `.<name>rc.toml`
/// 3. Continue up the directory tree until a fragment has `root = true` or `fs_root` is reached
/// 4. Then the user file in the home directory, if not already visited
/// 5. Finally the seeded `defaults`
///
/// `fs_root` and `fs_home` are compared against absolute directories, so
/// pass [`CascadeOptions::absolutized`] options.
///
/// Returns fragments in cascade order (most specific first).
pub async fn discover_fragments<P: Probe>(
	options: &CascadeOptions,
	cwd: &Path,
	probe: &P,
) -> Result<Vec<Fragment>, DiscoveryError> {
	let mut fragments = Vec::new();

	if let Some(ref explicit) = options.path_to_config {
		let path = if explicit.is_absolute() {
			explicit.clone()
		} else {
			cwd.join(explicit)
		};
		let fragment = load_fragment(&path, probe).await?.ok_or_else(|| {
			DiscoveryError::Read {
				source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
				path: path.clone(),
			}
		})?;
		tracing::debug!(source = %path.display(), "Loaded explicit config");
		fragments.push(fragment);
		push_defaults(options, &mut fragments)?;
		return Ok(fragments);
	}

	let mut visited = Vec::new();
	let mut current_dir = Some(cwd.to_path_buf());

	// Walk up the directory tree
	while let Some(dir) = current_dir {
		visited.push(dir.clone());

		if let Some(fragment) = load_from_dir(options, &dir, probe).await? {
			let is_root = fragment.is_root;
			fragments.push(fragment);
			if is_root {
				tracing::debug!(dir = %dir.display(), "Reached root config");
				break;
			}
		}

		if options.fs_root.as_deref() == Some(dir.as_path()) {
			break;
		}
		current_dir = dir.parent().map(Path::to_path_buf);
	}

	if let Some(home) = options.home_dir()
		&& !visited.contains(&home)
		&& let Some(fragment) = load_from_dir(options, &home, probe).await?
	{
		fragments.push(fragment);
	}

	push_defaults(options, &mut fragments)?;

	Ok(fragments)
}

/// Load the first rc file present in `dir`.
async fn load_from_dir<P: Probe>(
	options: &CascadeOptions,
	dir: &Path,
	probe: &P,
) -> Result<Option<Fragment>, DiscoveryError> {
	for file_name in options.candidate_names() {
		let path = dir.join(file_name);
		if let Some(fragment) = load_fragment(&path, probe).await? {
			tracing::debug!(source = %path.display(), root = fragment.is_root, "Discovered config");
			return Ok(Some(fragment));
		}
	}
	Ok(None)
}

async fn load_fragment<P: Probe>(
	path: &Path,
	probe: &P,
) -> Result<Option<Fragment>, DiscoveryError> {
	let content = probe
		.read_optional(path)
		.await
		.map_err(|source| DiscoveryError::Read {
			path: path.to_path_buf(),
			source,
		})?;

	content
		.map(|content| parse_fragment_str(&content, path, FragmentFormat::from_path(path)))
		.transpose()
}

fn push_defaults(
	options: &CascadeOptions,
	fragments: &mut Vec<Fragment>,
) -> Result<(), DiscoveryError> {
	if let Some(ref defaults) = options.defaults {
		fragments.push(fragment_from_settings(defaults.clone(), None)?);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::{Blocking, Suspending, run_blocking};
	use serde_json::json;
	use std::fs;

	fn options_for(cwd: &Path, home: &Path) -> CascadeOptions {
		CascadeOptions::new(cwd).with_fs_home(home)
	}

	#[test]
	fn test_discovery_walks_up_to_root() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		let outer = temp_dir.path().join("outer");
		let project = outer.join("project");
		let nested = project.join("src").join("blocks");
		fs::create_dir_all(&nested).unwrap();

		fs::write(outer.join(".bemrc"), r#"{ "outer": true }"#).unwrap();
		fs::write(project.join(".bemrc"), r#"{ "root": true, "color": "blue" }"#).unwrap();
		fs::write(nested.join(".bemrc.toml"), "color = \"red\"").unwrap();

		let options = options_for(&nested, home.path());
		let fragments = run_blocking(discover_fragments(&options, &nested, &Blocking)).unwrap();

		assert_eq!(fragments.len(), 2);
		assert_eq!(fragments[0].source, Some(nested.join(".bemrc.toml")));
		assert_eq!(fragments[0].settings["color"], "red");
		assert!(fragments[1].is_root);
		assert_eq!(fragments[1].source, Some(project.join(".bemrc")));
	}

	#[test]
	fn test_discovery_first_candidate_wins() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		fs::write(temp_dir.path().join(".bemrc"), r#"{ "root": true, "from": "rc" }"#).unwrap();
		fs::write(temp_dir.path().join(".bemrc.toml"), "from = \"toml\"").unwrap();

		let options = options_for(temp_dir.path(), home.path());
		let fragments =
			run_blocking(discover_fragments(&options, temp_dir.path(), &Blocking)).unwrap();

		assert_eq!(fragments.len(), 1);
		assert_eq!(fragments[0].settings["from"], "rc");
	}

	#[test]
	fn test_discovery_appends_home_and_defaults() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		fs::write(temp_dir.path().join(".bemrc"), r#"{ "root": true }"#).unwrap();
		fs::write(home.path().join(".bemrc"), r#"{ "user": 1 }"#).unwrap();

		let defaults = json!({ "fallback": true }).as_object().unwrap().clone();
		let options = options_for(temp_dir.path(), home.path()).with_defaults(defaults);
		let fragments =
			run_blocking(discover_fragments(&options, temp_dir.path(), &Blocking)).unwrap();

		assert_eq!(fragments.len(), 3);
		assert_eq!(fragments[1].settings["user"], 1);
		assert!(fragments[2].source.is_none());
		assert_eq!(fragments[2].settings["fallback"], true);
	}

	#[test]
	fn test_discovery_stops_at_fs_root() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		let inner = temp_dir.path().join("inner");
		fs::create_dir_all(&inner).unwrap();
		fs::write(temp_dir.path().join(".bemrc"), r#"{ "above": true }"#).unwrap();

		let options = options_for(&inner, home.path()).with_fs_root(&inner);
		let fragments = run_blocking(discover_fragments(&options, &inner, &Blocking)).unwrap();

		assert!(fragments.is_empty());
	}

	#[test]
	fn test_explicit_config_path_short_circuits() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		fs::write(temp_dir.path().join(".bemrc"), r#"{ "root": true }"#).unwrap();
		fs::write(temp_dir.path().join("custom.json"), r#"{ "custom": true }"#).unwrap();

		let options = options_for(temp_dir.path(), home.path()).with_config_path("custom.json");
		let fragments =
			run_blocking(discover_fragments(&options, temp_dir.path(), &Blocking)).unwrap();

		assert_eq!(fragments.len(), 1);
		assert_eq!(fragments[0].settings["custom"], true);
	}

	#[test]
	fn test_missing_explicit_config_is_read_error() {
		let temp_dir = tempfile::tempdir().unwrap();
		let options = CascadeOptions::new(temp_dir.path()).with_config_path("missing.json");

		let result = run_blocking(discover_fragments(&options, temp_dir.path(), &Blocking));
		assert!(matches!(result, Err(DiscoveryError::Read { .. })));
	}

	#[test]
	fn test_invalid_file_propagates() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		fs::write(temp_dir.path().join(".bemrc"), "{ broken").unwrap();

		let options = options_for(temp_dir.path(), home.path());
		let result = run_blocking(discover_fragments(&options, temp_dir.path(), &Blocking));

		assert!(matches!(result, Err(DiscoveryError::Parse { .. })));
	}

	#[tokio::test]
	async fn test_suspending_discovery_matches_blocking() {
		let temp_dir = tempfile::tempdir().unwrap();
		let home = tempfile::tempdir().unwrap();
		let nested = temp_dir.path().join("a").join("b");
		fs::create_dir_all(&nested).unwrap();
		fs::write(temp_dir.path().join(".bemrc"), r#"{ "root": true, "x": 1 }"#).unwrap();
		fs::write(nested.join(".bemrc"), r#"{ "x": 2 }"#).unwrap();

		let options = options_for(&nested, home.path());
		let suspended = discover_fragments(&options, &nested, &Suspending)
			.await
			.unwrap();
		let blocked = run_blocking(discover_fragments(&options, &nested, &Blocking)).unwrap();

		assert_eq!(suspended, blocked);
		assert_eq!(suspended.len(), 2);
	}
}
