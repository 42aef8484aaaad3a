//! Durable approval policy.
//!
//! # Overview
//!
//! Global and project approvals are stored in the shared `settings.json`
//! document. The approval engine owns only the `approvals` fragment; every
//! other key in the file belongs to someone else and must survive our
//! writes.
//!
//! # Update Sequence
//!
//! Every mutation runs the same sequence:
//!
//! 1. Acquire the exclusive lock on `settings.json.lock`
//! 2. Re-read the full document from disk
//! 3. Merge the change into the single target array
//! 4. Sort and de-duplicate that array
//! 5. Write the full document (temp file, then rename)
//! 6. Release the lock
//!
//! Reads never take the lock. A stale read can only cause an extra prompt;
//! the security gate is evaluated on every resolve regardless.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::approval::{ApprovalRule, RuleKind, Scope};
use crate::command::CommandSegment;

use super::lock::DocumentLock;
use super::types::{PolicySnapshot, APPROVALS_KEY};

/// Settings document file name inside the config dir.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings document is malformed: {0}")]
    Corrupt(String),

    #[error("Session approvals are not stored on disk")]
    NotDurable,
}

// ============================================================================
// DOCUMENT OPERATIONS
// ============================================================================

/// Load the full settings document.
///
/// A missing or blank file is an empty object. A file that exists but does
/// not parse is an error: it is never silently replaced.
pub fn load_document(path: &Path) -> Result<Value, PolicyError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let document: Value = serde_json::from_str(&contents)?;
    if !document.is_object() {
        return Err(PolicyError::Corrupt(
            "top level is not a JSON object".to_string(),
        ));
    }
    Ok(document)
}

/// Save the full settings document.
///
/// Uses write-then-rename so a crash mid-write leaves the previous document
/// in place.
pub fn save_document(path: &Path, document: &Value) -> Result<(), PolicyError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Extract the typed approvals view from a document.
pub fn snapshot_from_document(document: &Value) -> Result<PolicySnapshot, PolicyError> {
    match document.get(APPROVALS_KEY) {
        None | Some(Value::Null) => Ok(PolicySnapshot::default()),
        Some(fragment) => serde_json::from_value(fragment.clone()).map_err(|e| {
            PolicyError::Corrupt(format!("'{APPROVALS_KEY}' section is invalid: {e}"))
        }),
    }
}

/// Walk (creating as needed) to the array holding `kind` rules of `scope`.
fn rule_array<'a>(
    document: &'a mut Value,
    scope: &Scope,
    kind: RuleKind,
) -> Result<&'a mut Vec<Value>, PolicyError> {
    let root = as_object(document, "document")?;
    let approvals = as_object(
        root.entry(APPROVALS_KEY)
            .or_insert_with(|| Value::Object(Map::new())),
        APPROVALS_KEY,
    )?;

    let scope_obj = match scope {
        Scope::Global => approvals
            .entry("global")
            .or_insert_with(|| Value::Object(Map::new())),
        Scope::Project(name) => as_object(
            approvals
                .entry("projects")
                .or_insert_with(|| Value::Object(Map::new())),
            "projects",
        )?
        .entry(name.clone())
        .or_insert_with(|| Value::Object(Map::new())),
        Scope::Session => return Err(PolicyError::NotDurable),
    };

    let key = kind.storage_key();
    as_object(scope_obj, "scope")?
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| PolicyError::Corrupt(format!("'{key}' is not an array")))
}

fn as_object<'a>(
    value: &'a mut Value,
    what: &str,
) -> Result<&'a mut Map<String, Value>, PolicyError> {
    value
        .as_object_mut()
        .ok_or_else(|| PolicyError::Corrupt(format!("'{what}' is not an object")))
}

/// Sort and de-duplicate an array of strings in place.
fn normalize(array: &mut Vec<Value>) -> Result<(), PolicyError> {
    let mut items = array
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| PolicyError::Corrupt(format!("non-string approval entry {v}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    items.sort();
    items.dedup();
    *array = items.into_iter().map(Value::String).collect();
    Ok(())
}

// ============================================================================
// POLICY STORE
// ============================================================================

/// Durable approvals backed by `<config_dir>/settings.json`.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    /// Store rooted at a config directory.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            path: config_dir.as_ref().join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current approvals fresh from disk.
    pub fn snapshot(&self) -> Result<PolicySnapshot, PolicyError> {
        snapshot_from_document(&load_document(&self.path)?)
    }

    /// Check whether any rule of a durable scope covers the segment.
    ///
    /// Session rules live in the caller's state, so `Scope::Session` always
    /// reports no match here.
    pub fn lookup(&self, scope: &Scope, segment: &CommandSegment) -> Result<bool, PolicyError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .scope(scope)
            .is_some_and(|rules| rules.rules().iter().any(|r| r.matches(segment))))
    }

    /// Add a rule to a durable scope.
    ///
    /// Returns `false` (and leaves the file untouched) when the rule was
    /// already present.
    pub fn insert(&self, scope: &Scope, rule: &ApprovalRule) -> Result<bool, PolicyError> {
        self.update(scope, rule.kind(), |array| {
            let text = rule.text();
            if array.iter().any(|v| v.as_str() == Some(text)) {
                return false;
            }
            array.push(Value::String(text.to_string()));
            true
        })
    }

    /// Remove a rule from a durable scope. Returns whether it was present.
    pub fn remove(&self, scope: &Scope, kind: RuleKind, text: &str) -> Result<bool, PolicyError> {
        self.update(scope, kind, |array| {
            let before = array.len();
            array.retain(|v| v.as_str() != Some(text));
            array.len() != before
        })
    }

    /// Locked read-modify-write of one rule array. `change` returns whether
    /// it modified the array; unchanged documents are not rewritten.
    fn update<F>(&self, scope: &Scope, kind: RuleKind, change: F) -> Result<bool, PolicyError>
    where
        F: FnOnce(&mut Vec<Value>) -> bool,
    {
        if !scope.is_durable() {
            return Err(PolicyError::NotDurable);
        }

        let _lock = DocumentLock::acquire(&self.path)?;
        let mut document = load_document(&self.path)?;

        let array = rule_array(&mut document, scope, kind)?;
        if !change(array) {
            return Ok(false);
        }
        normalize(array)?;

        save_document(&self.path, &document)?;
        log::info!(
            "Updated {} {} approvals in {}",
            scope,
            kind.storage_key(),
            self.path.display()
        );
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================
