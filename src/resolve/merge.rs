//! Deep merge of settings mappings.
//!
//! Mappings merge key by key, sequences are replaced wholesale and any other
//! pairing is won by the override. Inputs are never modified.

use crate::config::types::Settings;
use serde_json::Value;

/// Merge `overlay` onto `base`, returning a new value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
	let mut out = base.clone();
	merge_into(&mut out, overlay);
	out
}

/// Merge two mappings, `overlay` taking precedence.
pub fn merge(base: &Settings, overlay: &Settings) -> Settings {
	let mut out = base.clone();
	merge_settings_into(&mut out, overlay);
	out
}

/// Fold any number of mappings left to right, later ones taking precedence.
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Settings>) -> Settings {
	layers.into_iter().fold(Settings::new(), |mut acc, layer| {
		merge_settings_into(&mut acc, layer);
		acc
	})
}

/// In-place variant of [`merge`] used by the resolvers' accumulators.
pub fn merge_settings_into(base: &mut Settings, overlay: &Settings) {
	for (key, overlay_value) in overlay {
		match base.get_mut(key) {
			Some(base_value) => merge_into(base_value, overlay_value),
			None => {
				base.insert(key.clone(), overlay_value.clone());
			}
		}
	}
}

fn merge_into(base: &mut Value, overlay: &Value) {
	match (base, overlay) {
		// Both are mappings: merge recursively
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			merge_settings_into(base_map, overlay_map);
		}
		// Sequences and everything else: overlay replaces base entirely
		(base, overlay) => *base = overlay.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn settings(value: Value) -> Settings {
		value.as_object().unwrap().clone()
	}

	#[test]
	fn test_merge_simple_objects() {
		let result = merge(&settings(json!({"a": 1, "b": 2})), &settings(json!({"b": 3, "c": 4})));
		assert_eq!(Value::Object(result), json!({"a": 1, "b": 3, "c": 4}));
	}

	#[test]
	fn test_merge_nested_objects() {
		let base = json!({
			"modules": { "bem-tools": { "plugins": { "create": { "techs": ["css"] } } } },
			"debug": true
		});
		let overlay = json!({
			"modules": { "bem-tools": { "plugins": { "create": { "levels": {} } } } }
		});
		assert_eq!(
			deep_merge(&base, &overlay),
			json!({
				"modules": {
					"bem-tools": { "plugins": { "create": { "techs": ["css"], "levels": {} } } }
				},
				"debug": true
			})
		);
	}

	#[test]
	fn test_arrays_replaced_not_concatenated() {
		let result = merge(&settings(json!({"x": [1, 2]})), &settings(json!({"x": [3]})));
		assert_eq!(Value::Object(result), json!({"x": [3]}));
	}

	#[test]
	fn test_type_mismatch_overlay_wins() {
		let base = json!({"a": {"b": 1}, "c": [1], "d": "s", "e": 1});
		let overlay = json!({"a": "flat", "c": {"k": 1}, "d": null, "e": [2]});
		assert_eq!(deep_merge(&base, &overlay), overlay);
	}

	#[test]
	fn test_disjoint_keys_are_union_in_any_order() {
		let a = settings(json!({"a": 1, "n": {"x": 1}}));
		let b = settings(json!({"b": [2]}));

		let ab = Value::Object(merge(&a, &b));
		let ba = Value::Object(merge(&b, &a));
		assert_eq!(ab, json!({"a": 1, "n": {"x": 1}, "b": [2]}));
		assert_eq!(ab, ba);
	}

	#[test]
	fn test_merge_does_not_mutate_inputs() {
		let base = settings(json!({"n": {"x": 1}, "l": [1]}));
		let overlay = settings(json!({"n": {"y": 2}, "l": [2]}));
		let base_before = base.clone();
		let overlay_before = overlay.clone();

		let _ = merge(&base, &overlay);

		assert_eq!(base, base_before);
		assert_eq!(overlay, overlay_before);
	}

	#[test]
	fn test_merge_all_later_wins() {
		let layers = [
			settings(json!({"a": 1})),
			settings(json!({"b": 2})),
			settings(json!({"a": 3, "c": 4})),
		];
		let result = merge_all(&layers);
		assert_eq!(Value::Object(result), json!({"a": 3, "b": 2, "c": 4}));
	}

	#[test]
	fn test_merge_all_empty() {
		assert!(merge_all(&[]).is_empty());
	}
}
