//! Configuration fragments and their discovery.
//!
//! This module handles:
//! - rc file parsing (JSON or TOML)
//! - Directory cascade discovery
//! - Cascade options

pub mod discovery;
pub mod options;
pub mod parser;
pub mod types;

pub use discovery::discover_fragments;
pub use options::{CascadeOptions, DEFAULT_NAME, FragmentPlugin};
pub use parser::{FragmentFormat, fragment_from_settings, parse_fragment_str};
pub use types::{
	EffectiveConfig, Fragment, LevelDeclaration, LibraryDeclaration, SetChunk, Settings,
};
