//! Value set expansion for value-set searches

use crate::error::{Error, Result};
use crate::models::Bundle;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolves a value set identifier to the codes it contains
#[async_trait]
pub trait ValueSetExpander: Send + Sync {
    async fn get_all_codes(&self, value_set_id: &str) -> Result<Vec<String>>;
}

/// In-memory value sets, looked up by `id` or canonical `url`.
///
/// Codes come from `expansion.contains` when the ValueSet is expanded,
/// otherwise from the concepts enumerated in `compose.include`.
#[derive(Debug, Clone, Default)]
pub struct ValueSetCatalog {
    codes: HashMap<String, Arc<Vec<String>>>,
}

impl ValueSetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load ValueSets from JSON text holding a ValueSet, a Bundle of
    /// ValueSets or an array of ValueSets.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let mut catalog = Self::new();

        match value.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => catalog.insert_bundle(&Bundle::from_value(&value)?)?,
            Some(_) => catalog.insert(&value)?,
            None => match value.as_array() {
                Some(items) => {
                    for item in items {
                        catalog.insert(item)?;
                    }
                }
                None => {
                    return Err(Error::InvalidValueSet(
                        "expected a ValueSet, a Bundle or an array".to_string(),
                    ))
                }
            },
        }

        Ok(catalog)
    }

    /// Add every ValueSet entry of a Bundle; other resource types are ignored.
    pub fn insert_bundle(&mut self, bundle: &Bundle) -> Result<()> {
        for entry in bundle.entries() {
            if entry.resource_type() == Some("ValueSet") {
                if let Some(resource) = &entry.resource {
                    self.insert(resource)?;
                }
            }
        }
        Ok(())
    }

    /// Add one ValueSet resource
    pub fn insert(&mut self, value_set: &Value) -> Result<()> {
        if value_set.get("resourceType").and_then(Value::as_str) != Some("ValueSet") {
            return Err(Error::InvalidValueSet(
                "resourceType must be ValueSet".to_string(),
            ));
        }

        let keys: Vec<&str> = ["id", "url"]
            .iter()
            .filter_map(|k| value_set.get(*k).and_then(Value::as_str))
            .collect();
        if keys.is_empty() {
            return Err(Error::InvalidValueSet(
                "ValueSet has neither id nor url".to_string(),
            ));
        }

        let codes = Arc::new(extract_codes(value_set));
        tracing::debug!(keys = ?keys, codes = codes.len(), "Registered ValueSet");

        for key in keys {
            self.codes.insert(key.to_string(), Arc::clone(&codes));
        }
        Ok(())
    }

    /// Register codes directly under an identifier
    pub fn insert_codes(&mut self, value_set_id: impl Into<String>, codes: Vec<String>) {
        self.codes.insert(value_set_id.into(), Arc::new(codes));
    }

    pub fn codes(&self, value_set_id: &str) -> Option<&[String]> {
        self.codes.get(value_set_id).map(|c| c.as_slice())
    }

    pub fn contains(&self, value_set_id: &str) -> bool {
        self.codes.contains_key(value_set_id)
    }
}

#[async_trait]
impl ValueSetExpander for ValueSetCatalog {
    async fn get_all_codes(&self, value_set_id: &str) -> Result<Vec<String>> {
        self.codes(value_set_id)
            .map(<[String]>::to_vec)
            .ok_or_else(|| Error::ValueSetNotFound(value_set_id.to_string()))
    }
}

fn extract_codes(value_set: &Value) -> Vec<String> {
    let mut codes = Vec::new();

    if let Some(contains) = value_set
        .get("expansion")
        .and_then(|e| e.get("contains"))
        .and_then(Value::as_array)
    {
        collect_contains(contains, &mut codes);
    } else if let Some(includes) = value_set
        .get("compose")
        .and_then(|c| c.get("include"))
        .and_then(Value::as_array)
    {
        for include in includes {
            let concepts = include.get("concept").and_then(Value::as_array);
            for concept in concepts.into_iter().flatten() {
                if let Some(code) = concept.get("code").and_then(Value::as_str) {
                    codes.push(code.to_string());
                }
            }
        }
    }

    let mut seen = HashSet::new();
    codes.retain(|c| seen.insert(c.clone()));
    codes
}

fn collect_contains(contains: &[Value], out: &mut Vec<String>) {
    for item in contains {
        // Abstract entries group children and are not selectable codes
        let is_abstract = item.get("abstract").and_then(Value::as_bool) == Some(true);
        if !is_abstract {
            if let Some(code) = item.get("code").and_then(Value::as_str) {
                out.push(code.to_string());
            }
        }
        if let Some(children) = item.get("contains").and_then(Value::as_array) {
            collect_contains(children, out);
        }
    }
}
