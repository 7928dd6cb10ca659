//! Named sets: parsing and in-scope expansion.
//!
//! A set is written either as a list of chunk mappings or in the shorthand
//! string form, where whitespace separates tokens:
//!
//! | token      | chunk                              |
//! |------------|------------------------------------|
//! | `name`     | `{ layer: name }`                  |
//! | `name@`    | `{ set: name }`                    |
//! | `@lib`     | `{ library: lib }`                 |
//! | `name@lib` | `{ library: lib, set: name }`      |
//!
//! Expansion splices in-scope `{ set }` references and leaves layers and
//! libraries for the caller, which needs the filesystem to resolve them.

use crate::config::types::{SetChunk, Settings};
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sets with in-scope references expanded, by set name.
pub type ResolvedSets = BTreeMap<String, Vec<SetChunk>>;

/// Parse the declared value of one set.
pub fn parse_set(set: &str, value: &Value) -> Result<Vec<SetChunk>> {
	match value {
		Value::String(shorthand) => parse_shorthand(set, shorthand),
		Value::Array(items) => {
			let mut chunks = Vec::with_capacity(items.len());
			for item in items {
				match item {
					Value::String(shorthand) => chunks.extend(parse_shorthand(set, shorthand)?),
					Value::Object(chunk) => chunks.push(parse_chunk_mapping(set, chunk)?),
					other => return Err(invalid_chunk(set, format!("unexpected chunk {other}"))),
				}
			}
			Ok(chunks)
		}
		Value::Object(chunk) => Ok(vec![parse_chunk_mapping(set, chunk)?]),
		other => Err(invalid_chunk(set, format!("unexpected set value {other}"))),
	}
}

fn parse_shorthand(set: &str, shorthand: &str) -> Result<Vec<SetChunk>> {
	shorthand
		.split_whitespace()
		.map(|token| match token.split_once('@') {
			None => Ok(SetChunk::Layer(token.to_string())),
			Some(("", "")) => Err(invalid_chunk(set, "bare `@`".to_string())),
			Some((name, "")) => Ok(SetChunk::Set(name.to_string())),
			Some(("", library)) => Ok(SetChunk::Library {
				library: library.to_string(),
				set: None,
			}),
			Some((name, library)) => Ok(SetChunk::Library {
				library: library.to_string(),
				set: Some(name.to_string()),
			}),
		})
		.collect()
}

fn parse_chunk_mapping(set: &str, chunk: &Settings) -> Result<SetChunk> {
	let field = |key: &str| -> Result<Option<String>> {
		match chunk.get(key) {
			None | Some(Value::Null) => Ok(None),
			Some(Value::String(value)) => Ok(Some(value.clone())),
			Some(other) => Err(invalid_chunk(
				set,
				format!("`{key}` must be a string, got {other}"),
			)),
		}
	};

	if let Some(library) = field("library")? {
		return Ok(SetChunk::Library {
			library,
			set: field("set")?,
		});
	}
	if let Some(name) = field("set")? {
		return Ok(SetChunk::Set(name));
	}
	if let Some(layer) = field("layer")? {
		return Ok(SetChunk::Layer(layer));
	}
	Err(invalid_chunk(
		set,
		"chunk needs one of `library`, `set` or `layer`".to_string(),
	))
}

fn invalid_chunk(set: &str, reason: String) -> ConfigError {
	ConfigError::InvalidSetChunk {
		set: set.to_string(),
		reason,
	}
}

/// Expand every declared set.
///
/// A `{ set }` chunk naming a set declared in `sets` is replaced by that
/// set's expanded chunks at the same position. References to undeclared sets,
/// layers and libraries are kept as they are. A set that reaches itself
/// through such references fails with [`ConfigError::CyclicSetReference`].
pub fn resolve_sets(sets: &Settings) -> Result<ResolvedSets> {
	let declared = sets
		.iter()
		.map(|(name, value)| Ok((name.clone(), parse_set(name, value)?)))
		.collect::<Result<BTreeMap<_, _>>>()?;

	let mut resolved = ResolvedSets::new();
	let mut visiting = Vec::new();
	for name in declared.keys() {
		expand(name, &declared, &mut resolved, &mut visiting)?;
	}
	Ok(resolved)
}

fn expand(
	name: &str,
	declared: &BTreeMap<String, Vec<SetChunk>>,
	resolved: &mut ResolvedSets,
	visiting: &mut Vec<String>,
) -> Result<Vec<SetChunk>> {
	if let Some(chunks) = resolved.get(name) {
		return Ok(chunks.clone());
	}
	if let Some(start) = visiting.iter().position(|visited| visited == name) {
		let mut cycle = visiting[start..].to_vec();
		cycle.push(name.to_string());
		return Err(ConfigError::CyclicSetReference { cycle });
	}

	visiting.push(name.to_string());
	let mut chunks = Vec::new();
	for chunk in declared.get(name).into_iter().flatten() {
		match chunk {
			SetChunk::Set(reference) if declared.contains_key(reference) => {
				chunks.extend(expand(reference, declared, resolved, visiting)?);
			}
			other => chunks.push(other.clone()),
		}
	}
	visiting.pop();

	resolved.insert(name.to_string(), chunks.clone());
	Ok(chunks)
}
