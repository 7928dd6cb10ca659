use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// An opaque settings mapping. Key order follows declaration order.
pub type Settings = serde_json::Map<String, Value>;

/// Keys that carry cascade bookkeeping rather than user settings.
pub const LEVELS_KEY: &str = "levels";
pub const SETS_KEY: &str = "sets";
pub const LIBS_KEY: &str = "libs";
pub const MODULES_KEY: &str = "modules";
pub const ROOT_KEY: &str = "root";

/// A level declared inside a fragment's `levels` list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelDeclaration {
	/// Logical name used by sets to reference this level.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub layer: Option<String>,

	/// Directory of the level. Absolute once the cascade is resolved.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,

	/// Per-level settings.
	#[serde(flatten)]
	pub settings: Settings,
}

impl LevelDeclaration {
	/// Declaration for a layer with no explicit path.
	pub fn layer(layer: impl Into<String>) -> Self {
		Self {
			layer: Some(layer.into()),
			..Default::default()
		}
	}

	/// Parse a declaration from a settings value, `None` if it isn't one.
	pub fn from_value(value: &Value) -> Option<Self> {
		let declaration: Self = serde_json::from_value(value.clone()).ok()?;
		if declaration.layer.is_none() && declaration.path.is_none() {
			return None;
		}
		Some(declaration)
	}

	/// Flatten back into a settings mapping (`layer`, `path` and the rest).
	pub fn to_settings(&self) -> Settings {
		let mut out = Settings::new();
		if let Some(ref layer) = self.layer {
			out.insert("layer".to_string(), Value::String(layer.clone()));
		}
		if let Some(ref path) = self.path {
			out.insert(
				"path".to_string(),
				Value::String(path.to_string_lossy().into_owned()),
			);
		}
		for (key, value) in &self.settings {
			out.insert(key.clone(), value.clone());
		}
		out
	}
}

/// One discovered configuration unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Fragment {
	/// File this fragment was read from. `None` for seeded defaults.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<PathBuf>,

	/// Marks the upward boundary of the project.
	#[serde(rename = "root")]
	pub is_root: bool,

	/// Level declarations, `None` when the fragment has no `levels` key.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub levels: Option<Vec<LevelDeclaration>>,

	/// Every other key: `sets`, `libs`, `modules` and opaque settings.
	#[serde(flatten)]
	pub settings: Settings,
}

impl Fragment {
	/// Directory containing the fragment's source file.
	pub fn directory(&self) -> Option<&Path> {
		self.source.as_deref().and_then(Path::parent)
	}

	pub fn levels(&self) -> &[LevelDeclaration] {
		self.levels.as_deref().unwrap_or_default()
	}

	/// Top-level settings without the `levels` list.
	pub fn common_settings(&self) -> Settings {
		let mut out = self.settings.clone();
		if self.is_root {
			out.insert(ROOT_KEY.to_string(), Value::Bool(true));
		}
		out
	}

	/// Full settings mapping as it takes part in the effective merge.
	pub fn to_settings(&self) -> Settings {
		let mut out = self.common_settings();
		if let Some(ref levels) = self.levels {
			let levels = levels
				.iter()
				.map(|level| Value::Object(level.to_settings()))
				.collect();
			out.insert(LEVELS_KEY.to_string(), Value::Array(levels));
		}
		out
	}
}

/// A reference inside a named set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetChunk {
	/// A level declared in the same scope, by layer name.
	Layer(String),

	/// A set of a library; `set` defaults to the referencing set's name.
	Library { library: String, set: Option<String> },

	/// Another set in the same scope.
	Set(String),
}

/// A validated `libs` entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryDeclaration {
	/// Explicit install directory of the library.
	pub path: Option<PathBuf>,

	/// Remaining keys of the entry.
	pub settings: Settings,
}

/// The merge of every applicable fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EffectiveConfig(Settings);

impl EffectiveConfig {
	pub fn new(settings: Settings) -> Self {
		Self(settings)
	}

	pub fn settings(&self) -> &Settings {
		&self.0
	}

	pub fn into_settings(self) -> Settings {
		self.0
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Effective level declarations (from the most specific fragment declaring any).
	pub fn levels(&self) -> Vec<LevelDeclaration> {
		match self.0.get(LEVELS_KEY) {
			Some(Value::Array(levels)) => levels
				.iter()
				.filter_map(LevelDeclaration::from_value)
				.collect(),
			_ => Vec::new(),
		}
	}

	/// Raw `sets` mapping.
	pub fn sets(&self) -> Option<&Settings> {
		self.0.get(SETS_KEY).and_then(Value::as_object)
	}

	/// Raw `libs` entries in declaration order.
	pub fn libs(&self) -> Vec<(&str, &Value)> {
		match self.0.get(LIBS_KEY) {
			Some(Value::Object(libs)) => libs.iter().map(|(k, v)| (k.as_str(), v)).collect(),
			_ => Vec::new(),
		}
	}

	pub fn module(&self, name: &str) -> Option<&Value> {
		self.0
			.get(MODULES_KEY)
			.and_then(Value::as_object)
			.and_then(|modules| modules.get(name))
	}
}
