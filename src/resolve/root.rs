use crate::config::types::Fragment;
use std::path::{Path, PathBuf};

/// Project root: directory of the outermost fragment flagged `root`.
///
/// `fragments` are in cascade order (most specific first).
pub fn detect_root(fragments: &[Fragment]) -> Option<PathBuf> {
	fragments
		.iter()
		.rev()
		.filter(|fragment| fragment.is_root)
		.find_map(Fragment::directory)
		.map(Path::to_path_buf)
}
