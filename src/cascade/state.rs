use crate::config::options::FragmentPlugin;
use crate::config::types::{EffectiveConfig, Fragment, Settings};
use crate::resolve::level::normalize_levels;
use crate::resolve::merge::merge_all;
use crate::resolve::root::detect_root;
use std::path::{Path, PathBuf};

/// Everything a cascade derives from its discovered fragments.
///
/// Built once per cascade and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeState {
	cwd: PathBuf,
	root: Option<PathBuf>,
	fragments: Vec<Fragment>,
	config: EffectiveConfig,
}

impl CascadeState {
	/// Detect the root, normalize level paths, run `plugins` and merge the
	/// effective config.
	///
	/// `fragments` are in cascade order (most specific first).
	pub fn new(cwd: PathBuf, mut fragments: Vec<Fragment>, plugins: &[FragmentPlugin]) -> Self {
		let root = detect_root(&fragments);
		normalize_levels(&mut fragments, root.as_deref().unwrap_or(&cwd));
		for plugin in plugins {
			fragments = plugin.apply(fragments);
		}

		let layers: Vec<Settings> = fragments.iter().rev().map(Fragment::to_settings).collect();
		let config = EffectiveConfig::new(merge_all(&layers));

		tracing::debug!(
			cwd = %cwd.display(),
			root = ?root,
			fragments = fragments.len(),
			"Resolved config cascade"
		);

		Self {
			cwd,
			root,
			fragments,
			config,
		}
	}

	/// Absolute directory the cascade was discovered from.
	pub fn cwd(&self) -> &Path {
		&self.cwd
	}

	pub fn root(&self) -> Option<&Path> {
		self.root.as_deref()
	}

	/// Directory relative paths resolve against: the root, else `cwd`.
	pub fn base_dir(&self) -> &Path {
		self.root.as_deref().unwrap_or(&self.cwd)
	}

	/// Fragments in cascade order, level paths absolute.
	pub fn fragments(&self) -> &[Fragment] {
		&self.fragments
	}

	pub fn config(&self) -> &EffectiveConfig {
		&self.config
	}
}
