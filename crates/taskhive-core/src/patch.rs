//! Patch operations for board updates.
//!
//! Supports:
//! - Path-based set operations (e.g., `title=Roadmap`, `backgroundColor=#FFF`)
//! - JSON Merge Patch (RFC 7396), applied to the board document
//!
//! A board update is a shallow merge: every field present in the patch
//! overwrites the stored value, absent fields stay as they are.

use crate::error::{CoreError, Result};
use crate::model::{Board, TaskList, Visibility};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single set operation (path = value).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetOperation {
    /// Dot-separated path (e.g., "title" or "visibility").
    pub path: String,
    /// Value to set.
    pub value: Value,
}

impl SetOperation {
    /// Create a new set operation.
    #[must_use]
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Parse a "key=value" string into a `SetOperation`.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidPath` if the format is invalid.
    pub fn parse(input: &str) -> Result<Self> {
        let (path, value) = input
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidPath(format!("expected 'key=value', got '{input}'")))?;

        let path = path.trim();
        if path.is_empty() {
            return Err(CoreError::InvalidPath(format!("empty key in '{input}'")));
        }
        let value_str = value.trim();

        // Try to parse as JSON first, fall back to string
        let value = serde_json::from_str(value_str)
            .unwrap_or_else(|_| Value::String(value_str.to_string()));

        Ok(Self::new(path, value))
    }
}

/// Get a mutable reference to the value at a dot-separated path, creating
/// intermediate objects if needed.
fn get_or_create_path<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    let mut current = root;

    for (i, part) in path.split('.').enumerate() {
        let Value::Object(obj) = current else {
            let parent: Vec<&str> = path.split('.').take(i).collect();
            return Err(CoreError::InvalidPath(format!(
                "cannot traverse into non-object at '{}'",
                parent.join(".")
            )));
        };
        current = obj
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    Ok(current)
}

/// Apply a set operation to a JSON value, returning the previous value.
///
/// # Errors
/// Returns `CoreError::InvalidPath` if the path cannot be resolved.
pub fn apply_set_operation(root: &mut Value, op: &SetOperation) -> Result<Option<Value>> {
    let target = get_or_create_path(root, &op.path)?;
    let old_value = match &*target {
        Value::Null => None,
        Value::Object(obj) if obj.is_empty() => None,
        other => Some(other.clone()),
    };
    *target = op.value.clone();
    Ok(old_value)
}

/// Apply a JSON Merge Patch (RFC 7396) to a value.
///
/// Rules:
/// - If patch is not an object, replace target with patch
/// - If patch is an object, merge recursively
///   - null values in patch remove keys from target
///   - other values replace/add keys
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_obj) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_obj) = target else {
        return;
    };

    for (key, value) in patch_obj {
        if value.is_null() {
            target_obj.remove(key);
        } else if value.is_object() {
            let target_value = target_obj
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            apply_merge_patch(target_value, value);
        } else {
            target_obj.insert(key.clone(), value.clone());
        }
    }
}

/// Detect changes between two values and return the differences.
#[must_use]
pub fn diff_values(old: &Value, new: &Value) -> Vec<(String, Option<Value>, Value)> {
    let mut changes = Vec::new();
    diff_recursive(old, new, String::new(), &mut changes);
    changes
}

fn diff_recursive(
    old: &Value,
    new: &Value,
    path: String,
    changes: &mut Vec<(String, Option<Value>, Value)>,
) {
    if old == new {
        return;
    }

    let child = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };

    match (old, new) {
        (Value::Object(old_obj), Value::Object(new_obj)) => {
            for (key, new_val) in new_obj {
                match old_obj.get(key) {
                    Some(old_val) => diff_recursive(old_val, new_val, child(key), changes),
                    None => changes.push((child(key), None, new_val.clone())),
                }
            }

            for (key, old_val) in old_obj {
                if !new_obj.contains_key(key) {
                    changes.push((child(key), Some(old_val.clone()), Value::Null));
                }
            }
        }
        _ => {
            let old_val = if old.is_null() { None } else { Some(old.clone()) };
            changes.push((path, old_val, new.clone()));
        }
    }
}

/// Fields of a board that may be overwritten after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BoardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<Vec<TaskList>>,
}

impl BoardPatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn background_color(color: impl Into<String>) -> Self {
        Self {
            background_color: Some(color.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn background_image(uri: impl Into<String>) -> Self {
        Self {
            background_image: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Build a patch from `key=value` assignments.
    ///
    /// # Errors
    /// Returns an error for malformed paths or keys a board does not have.
    pub fn from_operations(operations: &[SetOperation]) -> Result<Self> {
        let mut doc = Value::Object(Map::new());
        for op in operations {
            apply_set_operation(&mut doc, op)?;
        }
        Ok(serde_json::from_value(doc)?)
    }

    /// True when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the patch before it touches a board.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` for a blank title or when both
    /// background kinds are set at once.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(CoreError::Validation("board title must not be empty".into()));
            }
        }
        if self.background_color.is_some() && self.background_image.is_some() {
            return Err(CoreError::Validation(
                "backgroundColor and backgroundImage are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    /// Render as a merge patch document. Setting one background nulls the other.
    ///
    /// # Errors
    /// Returns `CoreError::Json` if serialization fails.
    pub fn to_merge_patch(&self) -> Result<Value> {
        let mut doc = serde_json::to_value(self)?;
        if let Value::Object(obj) = &mut doc {
            if let Some(Value::String(title)) = obj.get_mut("title") {
                *title = title.trim().to_string();
            }
            if self.background_color.is_some() {
                obj.insert("backgroundImage".into(), Value::Null);
            }
            if self.background_image.is_some() {
                obj.insert("backgroundColor".into(), Value::Null);
            }
        }
        Ok(doc)
    }
}

/// Apply a patch to a board, returning the new board and the top-level
/// fields that changed.
///
/// `id`, `workspaceId` and `createdAt` cannot be patched. Lists not named in
/// the patch are carried over as-is, including any loaded card detail.
///
/// # Errors
/// Returns an error if the patch is invalid or the document fails to round-trip.
pub fn apply_board_patch(board: &Board, patch: &BoardPatch) -> Result<(Board, Vec<String>)> {
    patch.validate()?;

    let old_json = serde_json::to_value(board)?;
    let mut new_json = old_json.clone();
    apply_merge_patch(&mut new_json, &patch.to_merge_patch()?);

    let mut updated: Board = serde_json::from_value(new_json.clone())?;
    if patch.lists.is_none() {
        updated.lists.clone_from(&board.lists);
    }

    let mut changed: Vec<String> = Vec::new();
    for (path, _, _) in diff_values(&old_json, &new_json) {
        let field = path.split('.').next().unwrap_or_default().to_string();
        if !changed.contains(&field) {
            changed.push(field);
        }
    }

    Ok((updated, changed))
}
