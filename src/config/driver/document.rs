//! Path navigation over a settings document
//!
//! A document is a JSON object nested by scope name, scope keys and field
//! path. These helpers never hand out references that outlive the call; the
//! drivers clone whatever leaves the critical section.

use serde_json::{Map, Value};

use crate::config::error::{kind_of, ConfigError, Result};

/// Number of leading path levels that [`remove`] never prunes (the scope name).
pub const RETAINED_LEVELS: usize = 1;

fn structural(path: &[String], depth: usize, found: &Value) -> ConfigError {
    ConfigError::Structural {
        path: path[..=depth].to_vec(),
        found: kind_of(found),
    }
}

/// Value stored at `path`, if any.
pub fn lookup<'a>(doc: &'a Map<String, Value>, path: &[String]) -> Result<Option<&'a Value>> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(None);
    };

    let mut current = doc;
    for (depth, segment) in parents.iter().enumerate() {
        match current.get(segment) {
            None => return Ok(None),
            Some(Value::Object(map)) => current = map,
            Some(other) => return Err(structural(path, depth, other)),
        }
    }

    Ok(current.get(last))
}

/// Store `value` at `path`, creating missing intermediate mappings.
///
/// Directly under a scope name only mappings may be stored.
pub fn assign(doc: &mut Map<String, Value>, path: &[String], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    if parents.len() < RETAINED_LEVELS && !value.is_object() {
        return Err(ConfigError::Structural {
            path: path.to_vec(),
            found: kind_of(&value),
        });
    }

    let mut current = doc;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            other => return Err(structural(path, depth, other)),
        };
    }

    current.insert(last.clone(), value);
    Ok(())
}

/// Remove the value at `path`.
///
/// Returns whether anything was removed. Mappings left empty along the path
/// are pruned, except the first [`RETAINED_LEVELS`] levels. Removing a
/// retained level itself only empties its mapping.
pub fn remove(doc: &mut Map<String, Value>, path: &[String]) -> Result<bool> {
    remove_at(doc, path, 0, path)
}

fn remove_at(
    map: &mut Map<String, Value>,
    rest: &[String],
    depth: usize,
    full: &[String],
) -> Result<bool> {
    let Some((segment, tail)) = rest.split_first() else {
        return Ok(false);
    };

    if tail.is_empty() && depth < RETAINED_LEVELS {
        return match map.get_mut(segment) {
            None => Ok(false),
            Some(Value::Object(child)) => {
                let removed = !child.is_empty();
                child.clear();
                Ok(removed)
            }
            Some(other) => Err(structural(full, depth, other)),
        };
    }

    if tail.is_empty() {
        return Ok(map.remove(segment).is_some());
    }

    let child = match map.get_mut(segment) {
        None => return Ok(false),
        Some(Value::Object(child)) => child,
        Some(other) => return Err(structural(full, depth, other)),
    };

    let removed = remove_at(child, tail, depth + 1, full)?;
    if removed && child.is_empty() && depth >= RETAINED_LEVELS {
        map.remove(segment);
    }
    Ok(removed)
}
