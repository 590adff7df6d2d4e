//! Linked-data processing primitives: expansion, compaction and RDF
//! conversion for the JSON-LD subset used by vocabulary corpora.
//!
//! The rest of the crate talks to these through [`LinkedDataProcessor`], so
//! another implementation can be swapped in without touching the resolver
//! or the graph builder.

pub mod compact;
pub mod context;
pub mod expand;
pub mod rdf;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::errors::{Result, VocabGraphError};
use crate::loader::DocumentLoader;
use crate::types::Dataset;

pub use compact::Compactor;
pub use context::{ActiveContext, ContextSource, TermDefinition, TypeMapping};
pub use rdf::{is_absolute, to_nquads, RdfWriter};

/// Expansion, compaction and triple conversion.
pub trait LinkedDataProcessor: Send + Sync {
    /// Expands a document into an array of node objects. `base` resolves
    /// relative identifiers and relative remote contexts.
    fn expand(&self, document: &Value, base: Option<&str>) -> Result<Value>;

    /// Compacts a document against `context`, which may be a context value,
    /// a document carrying `@context`, or the location of one.
    fn compact(&self, document: &Value, context: &Value) -> Result<Value>;

    /// Converts a document to triples grouped by graph name.
    fn to_rdf(&self, document: &Value) -> Result<Dataset>;
}

/// Built-in JSON-LD processor.
///
/// Remote contexts are fetched through the document loader and cached for
/// the lifetime of the processor.
pub struct JsonLdProcessor {
    loader: Arc<dyn DocumentLoader>,
    contexts: Mutex<HashMap<String, Value>>,
}

impl JsonLdProcessor {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            loader,
            contexts: Mutex::new(HashMap::new()),
        }
    }
}

impl ContextSource for JsonLdProcessor {
    fn fetch_context(&self, location: &str) -> Result<Value> {
        if let Ok(cache) = self.contexts.lock() {
            if let Some(hit) = cache.get(location) {
                return Ok(hit.clone());
            }
        }
        let document = self.loader.load(location).map_err(|e| {
            VocabGraphError::linked_data(format!(
                "failed to load remote context '{}': {}",
                location, e
            ))
        })?;
        if let Ok(mut cache) = self.contexts.lock() {
            cache.insert(location.to_string(), document.clone());
        }
        Ok(document)
    }
}

impl LinkedDataProcessor for JsonLdProcessor {
    fn expand(&self, document: &Value, base: Option<&str>) -> Result<Value> {
        let ctx = ActiveContext::new(base);
        let nodes = expand::expand_document(document, &ctx, self)?;
        Ok(Value::Array(nodes))
    }

    fn compact(&self, document: &Value, context: &Value) -> Result<Value> {
        let local = match context {
            Value::Object(map) if map.contains_key("@context") => map["@context"].clone(),
            other => other.clone(),
        };
        let ctx = ActiveContext::new(None).parse(&local, self)?;
        let nodes = expand::expand_document(document, &ActiveContext::new(None), self)?;

        let compactor = Compactor::new(&ctx);
        let mut compacted: Vec<Value> = nodes
            .iter()
            .map(|node| compactor.compact_element(node, None))
            .collect();

        let mut out = serde_json::Map::new();
        if has_context(&local) {
            out.insert("@context".to_string(), local);
        }
        match compacted.len() {
            0 => {}
            1 => {
                if let Value::Object(map) = compacted.remove(0) {
                    out.extend(map);
                }
            }
            _ => {
                out.insert("@graph".to_string(), Value::Array(compacted));
            }
        }
        Ok(Value::Object(out))
    }

    fn to_rdf(&self, document: &Value) -> Result<Dataset> {
        let expanded = self.expand(document, None)?;
        let nodes = expanded.as_array().cloned().unwrap_or_default();
        Ok(RdfWriter::new().convert(&nodes))
    }
}

fn has_context(local: &Value) -> bool {
    match local {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Returns the `@context` a document declares, with relative remote
/// references made absolute against `location`.
pub fn document_context(document: &Value, location: &str) -> Value {
    let context = document.get("@context").cloned().unwrap_or(Value::Null);
    rebase_context(context, location)
}

/// Makes the remote references of a context value absolute against `location`.
pub fn rebase_context(context: Value, location: &str) -> Value {
    match context {
        Value::String(reference) => Value::String(crate::loader::join_location(location, &reference)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rebase_context(item, location))
                .collect(),
        ),
        other => other,
    }
}
