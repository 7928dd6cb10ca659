//! Pure resolution algorithms over discovered fragments.
//!
//! Nothing here touches the filesystem except [`library::locate_library`],
//! which goes through a [`crate::probe::Probe`].

pub mod level;
pub mod library;
pub mod merge;
pub mod root;
pub mod sets;

pub use level::{LevelMap, level_config, level_map, normalize_levels, resolve_path};
pub use library::{library_dir, locate_library, validate_library};
pub use merge::{deep_merge, merge, merge_all};
pub use root::detect_root;
pub use sets::{ResolvedSets, parse_set, resolve_sets};
