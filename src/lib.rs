//! bem-config - cascading configuration for BEM projects.
//!
//! This library resolves project settings from `.bemrc` fragments found
//! between the working directory and the project root, including:
//! - Fragment discovery and parsing (JSON or TOML)
//! - Deep merging of fragments into the effective config
//! - Per-level settings and the map of all known levels
//! - Named sets of levels, expanded across delegated libraries
//!
//! Every query has an asynchronous form and a `_sync` form with the same
//! results and errors.
//!
//! # Example
//!
//! ```no_run
//! use bem_config::{CascadeOptions, ConfigCascade};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cascade = ConfigCascade::new(CascadeOptions::new(&cwd));
//!
//! if let Some(settings) = cascade.level_config_sync("common.blocks").unwrap() {
//!     println!("common.blocks: {settings:?}");
//! }
//!
//! for level in cascade.resolve_set_levels_sync("desktop").unwrap() {
//!     println!("level: {:?}", level.get("path"));
//! }
//! ```

pub mod cascade;
pub mod config;
pub mod error;
pub mod probe;
pub mod resolve;

pub use cascade::{CascadeState, ConfigCascade, SetLevelsOptions};
pub use config::{
	CascadeOptions, EffectiveConfig, Fragment, FragmentPlugin, LevelDeclaration, SetChunk, Settings,
};
pub use error::{ConfigError, DiscoveryError, Result};
pub use resolve::LevelMap;
