//! The configuration cascade facade.
//!
//! Every query exists twice: `async` (filesystem steps through `tokio::fs`)
//! and `_sync` (blocking `std::fs`). Both run the same code, generic over
//! [`Probe`], and share one write-once state cell per cascade.

pub mod state;

pub use state::CascadeState;

use crate::config::discovery::discover_fragments;
use crate::config::options::CascadeOptions;
use crate::config::types::{EffectiveConfig, Fragment, LevelDeclaration, SetChunk, Settings};
use crate::error::{ConfigError, Result};
use crate::probe::{Blocking, Probe, Suspending, run_blocking};
use crate::resolve::level::{self, LevelMap, level_path, resolve_path};
use crate::resolve::library::locate_library;
use crate::resolve::sets::resolve_sets;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Options for [`ConfigCascade::resolve_set_levels_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetLevelsOptions {
	/// Drop repeated levels, keeping the first occurrence.
	pub unique: bool,
}

/// Cascade identity and set name of a set being expanded.
type Visit = (PathBuf, String);

/// Configuration of one project (or library) directory.
#[derive(Debug)]
pub struct ConfigCascade {
	options: CascadeOptions,
	state: OnceLock<Arc<CascadeState>>,
}

impl ConfigCascade {
	pub fn new(options: CascadeOptions) -> Self {
		Self {
			options,
			state: OnceLock::new(),
		}
	}

	/// Cascade for the process working directory with default options.
	pub fn from_current_dir() -> Result<Self> {
		Ok(Self::new(CascadeOptions::from_current_dir()?))
	}

	pub fn options(&self) -> &CascadeOptions {
		&self.options
	}

	/// Whether fragments were already discovered.
	pub fn is_resolved(&self) -> bool {
		self.state.get().is_some()
	}

	// ------------------------------------------------------------------
	// Asynchronous queries
	// ------------------------------------------------------------------

	/// Discovered state, resolving it on first use.
	pub async fn state(&self) -> Result<Arc<CascadeState>> {
		self.load(&Suspending).await
	}

	/// Fragments in cascade order with normalized level paths.
	pub async fn fragments(&self) -> Result<Vec<Fragment>> {
		Ok(self.load(&Suspending).await?.fragments().to_vec())
	}

	/// Project root, `None` if no fragment is flagged `root`.
	pub async fn root(&self) -> Result<Option<PathBuf>> {
		Ok(self.load(&Suspending).await?.root().map(Path::to_path_buf))
	}

	/// Merge of all fragments.
	pub async fn effective_config(&self) -> Result<EffectiveConfig> {
		Ok(self.load(&Suspending).await?.config().clone())
	}

	/// Settings of the level at `path` (relative paths resolve against the root).
	pub async fn level_config(&self, path: impl AsRef<Path>) -> Result<Option<Settings>> {
		self.level_config_with(path.as_ref(), &Suspending).await
	}

	/// Settings of every project and library level, by absolute path.
	pub async fn level_map(&self) -> Result<LevelMap> {
		self.level_map_with(&Suspending).await
	}

	/// Levels of a named set, in set order, duplicates kept.
	pub async fn resolve_set_levels(&self, set: &str) -> Result<Vec<Settings>> {
		self.resolve_set_levels_with(set, SetLevelsOptions::default())
			.await
	}

	pub async fn resolve_set_levels_with(
		&self,
		set: &str,
		options: SetLevelsOptions,
	) -> Result<Vec<Settings>> {
		let levels = self
			.set_levels_with(set, &Suspending, &mut Vec::new())
			.await?;
		Ok(finish_set_levels(levels, options))
	}

	/// Cascade of library `name`, discovered from its install directory.
	pub async fn library(&self, name: &str) -> Result<ConfigCascade> {
		self.library_with(name, &Suspending).await
	}

	/// `modules[name]` of the effective config.
	pub async fn module(&self, name: &str) -> Result<Option<Value>> {
		Ok(self.load(&Suspending).await?.config().module(name).cloned())
	}

	// ------------------------------------------------------------------
	// Synchronous queries
	// ------------------------------------------------------------------

	pub fn state_sync(&self) -> Result<Arc<CascadeState>> {
		run_blocking(self.load(&Blocking))
	}

	pub fn fragments_sync(&self) -> Result<Vec<Fragment>> {
		Ok(self.state_sync()?.fragments().to_vec())
	}

	pub fn root_sync(&self) -> Result<Option<PathBuf>> {
		Ok(self.state_sync()?.root().map(Path::to_path_buf))
	}

	pub fn effective_config_sync(&self) -> Result<EffectiveConfig> {
		Ok(self.state_sync()?.config().clone())
	}

	pub fn level_config_sync(&self, path: impl AsRef<Path>) -> Result<Option<Settings>> {
		run_blocking(self.level_config_with(path.as_ref(), &Blocking))
	}

	pub fn level_map_sync(&self) -> Result<LevelMap> {
		run_blocking(self.level_map_with(&Blocking))
	}

	pub fn resolve_set_levels_sync(&self, set: &str) -> Result<Vec<Settings>> {
		self.resolve_set_levels_with_sync(set, SetLevelsOptions::default())
	}

	pub fn resolve_set_levels_with_sync(
		&self,
		set: &str,
		options: SetLevelsOptions,
	) -> Result<Vec<Settings>> {
		let levels = run_blocking(self.set_levels_with(set, &Blocking, &mut Vec::new()))?;
		Ok(finish_set_levels(levels, options))
	}

	pub fn library_sync(&self, name: &str) -> Result<ConfigCascade> {
		run_blocking(self.library_with(name, &Blocking))
	}

	pub fn module_sync(&self, name: &str) -> Result<Option<Value>> {
		Ok(self.state_sync()?.config().module(name).cloned())
	}

	// ------------------------------------------------------------------
	// Shared core
	// ------------------------------------------------------------------

	async fn load<P: Probe>(&self, probe: &P) -> Result<Arc<CascadeState>> {
		if let Some(state) = self.state.get() {
			return Ok(Arc::clone(state));
		}

		let options = self.options.absolutized()?;
		let fragments = discover_fragments(&options, &options.cwd, probe).await?;
		let state = Arc::new(CascadeState::new(options.cwd, fragments, &options.plugins));

		// A racing query may have stored an identical state first
		Ok(Arc::clone(self.state.get_or_init(|| state)))
	}

	async fn level_config_with<P: Probe>(
		&self,
		path: &Path,
		probe: &P,
	) -> Result<Option<Settings>> {
		let state = self.load(probe).await?;
		let level_path = resolve_path(state.base_dir(), path);
		Ok(level::level_config(&level_path, state.fragments()))
	}

	async fn library_with<P: Probe>(&self, name: &str, probe: &P) -> Result<ConfigCascade> {
		let state = self.load(probe).await?;
		let dir = locate_library(state.config(), name, state.base_dir(), probe).await?;
		Ok(ConfigCascade::new(self.options.for_library(&dir)))
	}

	async fn level_map_with<P: Probe>(&self, probe: &P) -> Result<LevelMap> {
		let state = self.load(probe).await?;
		let config = state.config();

		let mut library_levels = Vec::new();
		for (name, _) in config.libs() {
			let library = self.library_with(name, probe).await?;
			let library_state = library.load(probe).await?;
			library_levels.push(library_state.config().levels());
		}

		Ok(level::level_map(&config.levels(), &library_levels))
	}

	async fn set_levels_with<P: Probe>(
		&self,
		set: &str,
		probe: &P,
		visiting: &mut Vec<Visit>,
	) -> Result<Vec<Settings>> {
		let state = self.load(probe).await?;
		let config = state.config();

		let Some(sets) = config.sets().filter(|sets| sets.contains_key(set)) else {
			return Ok(Vec::new());
		};

		let visit = (state.cwd().to_path_buf(), set.to_string());
		if let Some(start) = visiting.iter().position(|seen| *seen == visit) {
			let cycle = visiting[start..]
				.iter()
				.chain(std::iter::once(&visit))
				.map(|(dir, name)| format!("{}:{name}", dir.display()))
				.collect();
			return Err(ConfigError::CyclicSetReference { cycle });
		}

		let mut resolved = resolve_sets(sets)?;
		let chunks = resolved.remove(set).unwrap_or_default();
		let declared_levels = config.levels();

		visiting.push(visit);
		let mut levels = Vec::new();
		let mut level_map: Option<LevelMap> = None;

		for chunk in &chunks {
			match chunk {
				SetChunk::Library { library, set: library_set } => {
					let library = self.library_with(library, probe).await?;
					let library_set = library_set.as_deref().unwrap_or(set);
					let nested = library.set_levels_with(library_set, probe, visiting);
					levels.extend(Box::pin(nested).await?);
				}
				SetChunk::Set(name) => {
					levels.extend(Box::pin(self.set_levels_with(name, probe, visiting)).await?);
				}
				SetChunk::Layer(layer) => {
					let declaration = declared_levels
						.iter()
						.find(|level| level.layer.as_deref() == Some(layer.as_str()))
						.cloned()
						.unwrap_or_else(|| LevelDeclaration::layer(layer.as_str()));
					let Some(path) = level_path(&declaration, state.base_dir()) else {
						continue;
					};

					if level_map.is_none() {
						level_map = Some(self.level_map_with(probe).await?);
					}
					match level_map.as_ref().and_then(|map| map.get(&path)) {
						Some(settings) => levels.push(settings.clone()),
						None => tracing::debug!(
							layer = %layer,
							path = %path.display(),
							"Layer has no level"
						),
					}
				}
			}
		}
		visiting.pop();

		Ok(levels)
	}
}

fn finish_set_levels(levels: Vec<Settings>, options: SetLevelsOptions) -> Vec<Settings> {
	if !options.unique {
		return levels;
	}
	let mut unique: Vec<Settings> = Vec::with_capacity(levels.len());
	for level in levels {
		if !unique.contains(&level) {
			unique.push(level);
		}
	}
	unique
}
