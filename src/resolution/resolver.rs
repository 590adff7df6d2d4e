use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::linked_data::{document_context, LinkedDataProcessor};
use crate::loader::DocumentLoader;
use crate::registry::Registry;

/// A fetched document together with its expanded form.
struct Fetched {
    location: String,
    document: Value,
    expanded: Value,
}

/// Dereferences `@id` references and merges the referenced documents into a
/// single materialized view, down to a bounded depth.
///
/// Fetches inside one call tree are sequential. Independent `resolve` calls
/// share nothing but the read-only registry, loader and processor and may run
/// concurrently.
pub struct ReferenceResolver<'a> {
    registry: &'a Registry,
    loader: &'a dyn DocumentLoader,
    processor: &'a dyn LinkedDataProcessor,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        registry: &'a Registry,
        loader: &'a dyn DocumentLoader,
        processor: &'a dyn LinkedDataProcessor,
    ) -> Self {
        Self {
            registry,
            loader,
            processor,
        }
    }

    /// Resolves the document named by `id`.
    ///
    /// References are followed `depth` levels deep; at depth zero the expanded
    /// document is returned as fetched. With `compact` set the result is
    /// compacted against the document's own context.
    ///
    /// Failing to fetch `id` itself is an error. Failing to fetch a nested
    /// reference turns that branch into `null` and logs a warning.
    pub fn resolve(&self, id: &str, compact: bool, depth: u32) -> Result<Value> {
        let mut ancestors = HashSet::new();
        self.resolve_document(id, compact, depth, &mut ancestors)
    }

    // ------------------------------------------------------------------
    // Private helpers
    // ------------------------------------------------------------------

    fn fetch(&self, id: &str) -> Result<Fetched> {
        let location = self.registry.resolve_location(id);
        let document = self.loader.load(&location)?;
        let expanded = self.processor.expand(&document, Some(&location))?;
        Ok(Fetched {
            location,
            document,
            expanded,
        })
    }

    fn resolve_document(
        &self,
        id: &str,
        compact: bool,
        depth: u32,
        ancestors: &mut HashSet<String>,
    ) -> Result<Value> {
        let fetched = self.fetch(id)?;
        debug!(id, depth, "resolving document");

        let resolved = if depth == 0 {
            fetched.expanded
        } else {
            ancestors.insert(fetched.location.clone());
            let walked = match fetched.expanded {
                Value::Array(nodes) => Value::Array(
                    nodes
                        .into_iter()
                        .map(|node| self.resolve_properties(node, compact, depth, ancestors))
                        .collect(),
                ),
                other => self.resolve_properties(other, compact, depth, ancestors),
            };
            ancestors.remove(&fetched.location);
            walked
        };

        if compact {
            let context = document_context(&fetched.document, &fetched.location);
            self.processor.compact(&resolved, &context)
        } else {
            Ok(resolved)
        }
    }

    /// Walks the properties of a top-level node; the node itself is the
    /// document being resolved, never a reference.
    fn resolve_properties(
        &self,
        node: Value,
        compact: bool,
        depth: u32,
        ancestors: &mut HashSet<String>,
    ) -> Value {
        match node {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = self.resolve_value(v, compact, depth, ancestors);
                        (k, v)
                    })
                    .collect(),
            ),
            other => self.resolve_value(other, compact, depth, ancestors),
        }
    }

    /// Walks an expanded value, replacing references with their targets.
    /// Only called with `depth > 0`.
    fn resolve_value(
        &self,
        value: Value,
        compact: bool,
        depth: u32,
        ancestors: &mut HashSet<String>,
    ) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.resolve_value(item, compact, depth, ancestors))
                    .collect(),
            ),
            Value::Object(map) => match self.reference_location(&map) {
                Some(location) => self.resolve_reference(map, location, compact, depth, ancestors),
                None => Value::Object(
                    map.into_iter()
                        .map(|(k, v)| {
                            let v = self.resolve_value(v, compact, depth, ancestors);
                            (k, v)
                        })
                        .collect(),
                ),
            },
            primitive => primitive,
        }
    }

    /// The location to fetch when `map` is a reference: it has an `@id`, no
    /// `@type`, and the identifier resolves to an absolute location.
    fn reference_location(&self, map: &Map<String, Value>) -> Option<String> {
        if map.contains_key("@type") || map.contains_key("@value") || map.contains_key("@list") {
            return None;
        }
        let id = map.get("@id")?.as_str()?;
        let location = self.registry.resolve_location(id);
        location.contains("://").then_some(location)
    }

    fn resolve_reference(
        &self,
        mut map: Map<String, Value>,
        location: String,
        compact: bool,
        depth: u32,
        ancestors: &mut HashSet<String>,
    ) -> Value {
        if ancestors.contains(&location) {
            debug!(location = location.as_str(), "reference cycle; leaving reference in place");
            return Value::Object(map);
        }

        map.remove("@id");
        let overrides: Map<String, Value> = map
            .into_iter()
            .map(|(k, v)| {
                let v = self.resolve_value(v, compact, depth, ancestors);
                (k, v)
            })
            .collect();

        let target = match self.resolve_document(&location, compact, depth - 1, ancestors) {
            Ok(target) => unwrap_single(target),
            Err(e) => {
                warn!(id = location.as_str(), error = %e, "missing reference; branch resolved to null");
                return Value::Null;
            }
        };

        if overrides.is_empty() {
            return target;
        }
        match self.merge(target, overrides, compact) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(id = location.as_str(), error = %e, "failed to merge reference; branch resolved to null");
                Value::Null
            }
        }
    }

    /// Lays the referencing object's own properties over the fetched target.
    fn merge(&self, target: Value, overrides: Map<String, Value>, compact: bool) -> Result<Value> {
        if compact {
            let context = target.get("@context").cloned().unwrap_or(Value::Null);
            let expanded = unwrap_single(self.processor.expand(&target, None)?);
            let mut node = match expanded {
                Value::Object(node) => node,
                _ => Map::new(),
            };
            node.extend(overrides);
            self.processor.compact(&Value::Object(node), &context)
        } else {
            let mut node = match target {
                Value::Object(node) => node,
                other => return Ok(other),
            };
            node.extend(overrides);
            Ok(Value::Object(node))
        }
    }
}

/// A single-element list stands for its element.
fn unwrap_single(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}
