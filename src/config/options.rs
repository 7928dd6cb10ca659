use crate::config::types::{Fragment, Settings};
use crate::error::{ConfigError, Result};
use crate::resolve::level::resolve_path;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base name of the rc files when none is given.
pub const DEFAULT_NAME: &str = "bem";

/// A user transform applied to every fragment after level paths are normalized.
///
/// The closure receives one fragment and the full list as it was before this
/// plugin ran, and returns the replacement fragment.
#[derive(Clone)]
pub struct FragmentPlugin(Arc<dyn Fn(Fragment, &[Fragment]) -> Fragment + Send + Sync>);

impl FragmentPlugin {
	pub fn new(
		transform: impl Fn(Fragment, &[Fragment]) -> Fragment + Send + Sync + 'static,
	) -> Self {
		Self(Arc::new(transform))
	}

	/// Run the plugin over every fragment.
	pub fn apply(&self, fragments: Vec<Fragment>) -> Vec<Fragment> {
		fragments
			.iter()
			.cloned()
			.map(|fragment| (self.0)(fragment, &fragments))
			.collect()
	}
}

impl fmt::Debug for FragmentPlugin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FragmentPlugin").finish_non_exhaustive()
	}
}

impl PartialEq for FragmentPlugin {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

/// Where and how a cascade looks for its fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOptions {
	/// Directory discovery starts from.
	pub cwd: PathBuf,

	/// Base name of rc files: `bem` looks for `.bemrc`.
	pub name: String,

	/// Highest directory the upward walk visits.
	pub fs_root: Option<PathBuf>,

	/// Directory holding the user-level rc file. Defaults to the home directory.
	pub fs_home: Option<PathBuf>,

	/// Settings seeded as the lowest-priority fragment.
	pub defaults: Option<Settings>,

	/// Explicit rc file. Skips the directory walk.
	pub path_to_config: Option<PathBuf>,

	/// Fragment transforms, applied in order.
	pub plugins: Vec<FragmentPlugin>,
}

impl CascadeOptions {
	pub fn new(cwd: impl Into<PathBuf>) -> Self {
		Self {
			cwd: cwd.into(),
			name: DEFAULT_NAME.to_string(),
			fs_root: None,
			fs_home: None,
			defaults: None,
			path_to_config: None,
			plugins: Vec::new(),
		}
	}

	/// Options rooted at the process working directory.
	pub fn from_current_dir() -> Result<Self> {
		let cwd =
			std::env::current_dir().map_err(|source| ConfigError::CurrentDirectory { source })?;
		Ok(Self::new(cwd))
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn with_fs_root(mut self, fs_root: impl Into<PathBuf>) -> Self {
		self.fs_root = Some(fs_root.into());
		self
	}

	pub fn with_fs_home(mut self, fs_home: impl Into<PathBuf>) -> Self {
		self.fs_home = Some(fs_home.into());
		self
	}

	pub fn with_defaults(mut self, defaults: Settings) -> Self {
		self.defaults = Some(defaults);
		self
	}

	pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path_to_config = Some(path.into());
		self
	}

	pub fn with_plugin(mut self, plugin: FragmentPlugin) -> Self {
		self.plugins.push(plugin);
		self
	}

	/// Rc file names probed in each directory, in priority order.
	pub fn candidate_names(&self) -> [String; 3] {
		[
			format!(".{}rc", self.name),
			format!(".{}rc.json", self.name),
			format!(".{}rc.toml", self.name),
		]
	}

	/// Home directory used for the user-level rc file, if any.
	pub fn home_dir(&self) -> Option<PathBuf> {
		self.fs_home.clone().or_else(dirs::home_dir)
	}

	/// A copy with `cwd`, `fs_root` and `fs_home` absolute and normalized.
	///
	/// Relative paths resolve against the process working directory.
	pub fn absolutized(&self) -> Result<Self> {
		Ok(Self {
			cwd: make_absolute(&self.cwd)?,
			fs_root: self.fs_root.as_deref().map(make_absolute).transpose()?,
			fs_home: self.fs_home.as_deref().map(make_absolute).transpose()?,
			..self.clone()
		})
	}

	/// Options for a library cascade installed at `dir`.
	///
	/// Seeded defaults, explicit config paths and plugins belong to the parent
	/// project only.
	pub fn for_library(&self, dir: &Path) -> Self {
		Self {
			cwd: dir.to_path_buf(),
			name: self.name.clone(),
			fs_root: self.fs_root.clone(),
			fs_home: self.fs_home.clone(),
			defaults: None,
			path_to_config: None,
			plugins: Vec::new(),
		}
	}
}

fn make_absolute(path: &Path) -> Result<PathBuf> {
	let base = if path.is_absolute() {
		PathBuf::new()
	} else {
		std::env::current_dir().map_err(|source| ConfigError::CurrentDirectory { source })?
	};
	Ok(resolve_path(&base, path))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_candidate_names() {
		let options = CascadeOptions::new("/proj").with_name("enb");
		assert_eq!(
			options.candidate_names(),
			[".enbrc", ".enbrc.json", ".enbrc.toml"]
		);
	}

	#[test]
	fn test_for_library_drops_project_only_options() {
		let defaults = json!({ "color": "red" }).as_object().unwrap().clone();
		let options = CascadeOptions::new("/proj")
			.with_name("enb")
			.with_fs_home("/home/u")
			.with_fs_root("/")
			.with_defaults(defaults)
			.with_config_path("/proj/custom.json")
			.with_plugin(FragmentPlugin::new(|fragment, _| fragment));

		let library = options.for_library(Path::new("/proj/node_modules/bem-core"));

		assert_eq!(library.cwd, PathBuf::from("/proj/node_modules/bem-core"));
		assert_eq!(library.name, "enb");
		assert_eq!(library.fs_home, Some(PathBuf::from("/home/u")));
		assert_eq!(library.fs_root, Some(PathBuf::from("/")));
		assert!(library.defaults.is_none());
		assert!(library.path_to_config.is_none());
		assert!(library.plugins.is_empty());
	}

	#[test]
	fn test_absolutized_resolves_relative_paths() {
		let current = std::env::current_dir().unwrap();
		let options = CascadeOptions::new("proj/src")
			.with_fs_root("proj/../proj")
			.with_fs_home("/home/u/./cfg");

		let absolute = options.absolutized().unwrap();

		assert_eq!(absolute.cwd, current.join("proj").join("src"));
		assert_eq!(absolute.fs_root, Some(current.join("proj")));
		assert_eq!(absolute.fs_home, Some(PathBuf::from("/home/u/cfg")));
		assert_eq!(absolute.name, options.name);
	}

	#[test]
	fn test_plugin_sees_fragments_before_it_ran() {
		let plugin = FragmentPlugin::new(|mut fragment, all| {
			fragment.settings.insert("count".to_string(), json!(all.len()));
			fragment
		});
		let fragments = vec![Fragment::default(), Fragment::default()];

		let transformed = plugin.apply(fragments);

		assert_eq!(transformed.len(), 2);
		assert!(transformed.iter().all(|fragment| fragment.settings["count"] == 2));
		assert_eq!(plugin, plugin.clone());
		assert_ne!(plugin, FragmentPlugin::new(|fragment, _| fragment));
	}

	#[test]
	fn test_home_dir_override() {
		let options = CascadeOptions::new("/proj").with_fs_home("/tmp/home");
		assert_eq!(options.home_dir(), Some(PathBuf::from("/tmp/home")));
	}
}
