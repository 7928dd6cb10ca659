use crate::config::types::{Fragment, LEVELS_KEY, LevelDeclaration, ROOT_KEY, Settings};
use crate::error::DiscoveryError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// On-disk syntax of a fragment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentFormat {
	Json,
	Toml,
}

impl FragmentFormat {
	/// Pick the syntax from the file extension. Extensionless rc files are JSON.
	pub fn from_path(path: &Path) -> Self {
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("toml") => FragmentFormat::Toml,
			_ => FragmentFormat::Json,
		}
	}
}

/// Parse a fragment from file content (useful for testing).
pub fn parse_fragment_str(
	content: &str,
	path: &Path,
	format: FragmentFormat,
) -> Result<Fragment, DiscoveryError> {
	let value: Value = match format {
		FragmentFormat::Json => {
			serde_json::from_str(content).map_err(|source| DiscoveryError::Parse {
				path: path.to_path_buf(),
				source,
			})?
		}
		FragmentFormat::Toml => toml::from_str(content).map_err(|source| DiscoveryError::Toml {
			path: path.to_path_buf(),
			source,
		})?,
	};

	match value {
		Value::Object(settings) => fragment_from_settings(settings, Some(path.to_path_buf())),
		_ => Err(DiscoveryError::InvalidFragment {
			path: path.to_path_buf(),
			reason: "top level must be a mapping".to_string(),
		}),
	}
}

/// Split a settings mapping into a fragment, checking the keys the cascade relies on.
pub fn fragment_from_settings(
	mut settings: Settings,
	source: Option<PathBuf>,
) -> Result<Fragment, DiscoveryError> {
	let invalid = |reason: String| DiscoveryError::InvalidFragment {
		path: source.clone().unwrap_or_else(|| PathBuf::from("<defaults>")),
		reason,
	};

	let is_root = match settings.shift_remove(ROOT_KEY) {
		None | Some(Value::Null) => false,
		Some(Value::Bool(flag)) => flag,
		Some(other) => return Err(invalid(format!("`root` must be a boolean, got {other}"))),
	};

	let levels = match settings.shift_remove(LEVELS_KEY) {
		None => None,
		Some(Value::Array(items)) => Some(
			items
				.iter()
				.enumerate()
				.map(|(i, item)| {
					LevelDeclaration::from_value(item).ok_or_else(|| {
						invalid(format!("`levels[{i}]` must be a mapping with `layer` or `path`"))
					})
				})
				.collect::<Result<Vec<_>, _>>()?,
		),
		Some(_) => return Err(invalid("`levels` must be a list".to_string())),
	};

	Ok(Fragment {
		source,
		is_root,
		levels,
		settings,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_parse_empty_json_config() {
		let path = PathBuf::from("/proj/.bemrc");
		let fragment = parse_fragment_str("{}", &path, FragmentFormat::Json).unwrap();

		assert!(!fragment.is_root);
		assert!(fragment.levels.is_none());
		assert!(fragment.settings.is_empty());
		assert_eq!(fragment.source, Some(path));
	}

	#[test]
	fn test_parse_json_config() {
		let content = r#"{
			"root": true,
			"levels": [
				{ "layer": "common" },
				{ "layer": "desktop", "path": "blocks/desktop", "scheme": "nested" }
			],
			"libs": { "bem-core": {} },
			"color": "red"
		}"#;
		let path = PathBuf::from("/proj/.bemrc");
		let fragment = parse_fragment_str(content, &path, FragmentFormat::Json).unwrap();

		assert!(fragment.is_root);
		let levels = fragment.levels();
		assert_eq!(levels.len(), 2);
		assert_eq!(levels[0].layer.as_deref(), Some("common"));
		assert_eq!(levels[1].path, Some(PathBuf::from("blocks/desktop")));
		assert_eq!(levels[1].settings["scheme"], "nested");
		assert_eq!(fragment.settings["color"], "red");
		assert!(!fragment.settings.contains_key("root"));
		assert!(!fragment.settings.contains_key("levels"));
	}

	#[test]
	fn test_parse_toml_config() {
		let content = r#"
root = true
color = "blue"

[[levels]]
layer = "common"

[libs.bem-core]
path = "vendor/bem-core"
"#;
		let path = PathBuf::from("/proj/.bemrc.toml");
		let fragment =
			parse_fragment_str(content, &path, FragmentFormat::from_path(&path)).unwrap();

		assert!(fragment.is_root);
		assert_eq!(fragment.levels().len(), 1);
		assert_eq!(
			fragment.settings["libs"],
			json!({ "bem-core": { "path": "vendor/bem-core" } })
		);
	}

	#[test]
	fn test_format_from_path() {
		assert_eq!(
			FragmentFormat::from_path(Path::new("/p/.bemrc")),
			FragmentFormat::Json
		);
		assert_eq!(
			FragmentFormat::from_path(Path::new("/p/.bemrc.json")),
			FragmentFormat::Json
		);
		assert_eq!(
			FragmentFormat::from_path(Path::new("/p/.bemrc.toml")),
			FragmentFormat::Toml
		);
	}

	#[test]
	fn test_invalid_json_is_parse_error() {
		let path = PathBuf::from("/proj/.bemrc");
		let result = parse_fragment_str("{ not json", &path, FragmentFormat::Json);

		match result.unwrap_err() {
			DiscoveryError::Parse { path: p, .. } => assert_eq!(p, path),
			other => panic!("Expected Parse error, got {other:?}"),
		}
	}

	#[test]
	fn test_shape_checks() {
		let path = PathBuf::from("/proj/.bemrc");

		for content in [
			"[]",
			r#"{ "root": "yes" }"#,
			r#"{ "levels": {} }"#,
			r#"{ "levels": [{ "scheme": "flat" }] }"#,
		] {
			let result = parse_fragment_str(content, &path, FragmentFormat::Json);
			assert!(
				matches!(result, Err(DiscoveryError::InvalidFragment { .. })),
				"expected shape error for {content}"
			);
		}
	}

	#[test]
	fn test_defaults_fragment_has_no_source() {
		let settings = json!({ "levels": [{ "layer": "common" }] })
			.as_object()
			.unwrap()
			.clone();
		let fragment = fragment_from_settings(settings, None).unwrap();

		assert!(fragment.source.is_none());
		assert!(fragment.directory().is_none());
		assert_eq!(fragment.levels().len(), 1);
	}
}
