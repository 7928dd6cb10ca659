use crate::config::types::{Fragment, LEVELS_KEY, LevelDeclaration, ROOT_KEY, Settings};
use crate::resolve::merge::{merge, merge_settings_into};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Settings of every known level, keyed by absolute level path.
pub type LevelMap = BTreeMap<PathBuf, Settings>;

/// Keys removed from a level's resolved settings.
const BOOKKEEPING_KEYS: [&str; 4] = ["source", "path", LEVELS_KEY, ROOT_KEY];

/// Suffix of a level directory derived from its layer name.
const LEVEL_DIR_SUFFIX: &str = ".blocks";

/// Join `path` onto `base` and fold `.` and `..` lexically.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for component in base.join(path).components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				out.pop();
			}
			other => out.push(other),
		}
	}
	out
}

fn default_level_dir(layer: &str) -> PathBuf {
	PathBuf::from(format!("{layer}{LEVEL_DIR_SUFFIX}"))
}

/// Fill in and absolutize every level path, once per cascade.
///
/// Paths defaulted from the layer name resolve against `base` (the project
/// root, or the working directory without one); declared relative paths
/// resolve against the directory of the fragment that declares them.
pub fn normalize_levels(fragments: &mut [Fragment], base: &Path) {
	for fragment in fragments.iter_mut() {
		let declared_base = fragment
			.directory()
			.map(Path::to_path_buf)
			.unwrap_or_else(|| base.to_path_buf());

		let Some(ref mut levels) = fragment.levels else {
			continue;
		};
		for level in levels.iter_mut() {
			let path = match (level.path.take(), level.layer.as_deref()) {
				(Some(path), _) => resolve_path(&declared_base, &path),
				(None, Some(layer)) => resolve_path(base, &default_level_dir(layer)),
				// Rejected by the parser
				(None, None) => continue,
			};
			level.path = Some(path);
		}
	}
}

/// Absolute path of a level, defaulting it from the layer name when undeclared.
pub fn level_path(level: &LevelDeclaration, base: &Path) -> Option<PathBuf> {
	match (&level.path, &level.layer) {
		(Some(path), _) => Some(resolve_path(base, path)),
		(None, Some(layer)) => Some(resolve_path(base, &default_level_dir(layer))),
		(None, None) => None,
	}
}

/// Resolve the settings that apply to the level at `level_path`.
///
/// Only fragments inside the project boundary take part: from the most
/// specific one up to and including the first fragment flagged `root`.
/// Seeded fragments (no source file) always take part, at the lowest
/// priority. Within that window common settings accumulate from general to specific,
/// declarations whose path equals `level_path` accumulate the same way, and
/// the level declarations win over the common settings.
///
/// Returns `None` when nothing applies.
pub fn level_config(level_path: &Path, fragments: &[Fragment]) -> Option<Settings> {
	let boundary = fragments
		.iter()
		.position(|fragment| fragment.is_root)
		.map_or(fragments.len(), |i| i + 1);

	let mut common = Settings::new();
	let mut overrides = Settings::new();

	let window = fragments
		.iter()
		.enumerate()
		.filter(|(i, fragment)| *i < boundary || fragment.source.is_none())
		.map(|(_, fragment)| fragment);

	for fragment in window.rev() {
		merge_settings_into(&mut common, &fragment.common_settings());

		for level in fragment.levels() {
			if level.path.as_deref() != Some(level_path) {
				continue;
			}
			tracing::trace!(
				level = %level_path.display(),
				source = ?fragment.source,
				"Matched level declaration"
			);
			merge_settings_into(&mut overrides, &level.to_settings());
		}
	}

	let mut resolved = merge(&common, &overrides);
	for key in BOOKKEEPING_KEYS {
		resolved.shift_remove(key);
	}

	if resolved.is_empty() {
		None
	} else {
		Some(resolved)
	}
}

/// Build the level map from library levels and the project's own levels.
///
/// Libraries merge first in declaration order, project levels last so they
/// win on a path collision.
pub fn level_map(
	project_levels: &[LevelDeclaration],
	library_levels: &[Vec<LevelDeclaration>],
) -> LevelMap {
	let mut map = LevelMap::new();

	for level in library_levels.iter().flatten().chain(project_levels) {
		let Some(ref path) = level.path else {
			continue;
		};
		let entry = map.entry(path.clone()).or_default();
		merge_settings_into(entry, &level.to_settings());
	}

	map
}
