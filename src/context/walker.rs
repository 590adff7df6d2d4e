use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{Result, VocabGraphError};
use crate::graph::local_name;
use crate::types::{Graph, GraphLink};

/// Synthesizes nested context templates by walking a built graph outward
/// from a node along its outgoing links.
pub struct ContextWalker<'a> {
    graph: &'a Graph,
    /// Outgoing links by source, in graph order.
    outgoing: HashMap<&'a str, Vec<&'a GraphLink>>,
}

impl<'a> ContextWalker<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        let mut outgoing: HashMap<&str, Vec<&GraphLink>> = HashMap::new();
        for link in &graph.links {
            outgoing.entry(link.source.as_str()).or_default().push(link);
        }
        Self { graph, outgoing }
    }

    /// Maps each outgoing predicate of `node_id` to the template of its
    /// target. A node without outgoing links yields the "extend here" leaf.
    ///
    /// When several links share a predicate the last one wins. Re-entering a
    /// node already on the current path also yields the leaf.
    pub fn walk(&self, node_id: &str) -> Value {
        let mut path = HashSet::new();
        self.walk_inner(node_id, &mut path)
    }

    /// Builds the context document for an RDF type, rooted at the type's
    /// representative node:
    /// `{"@context": {"@vocab": <vocab name>, <predicate>: <template>, ...}}`.
    pub fn context_for_type(&self, type_id: &str) -> Result<Value> {
        let root = self
            .graph
            .types
            .get(type_id)
            .ok_or_else(|| VocabGraphError::UnknownType {
                type_id: type_id.to_string(),
            })?;

        let vocab = self
            .graph
            .vocab
            .get(type_id)
            .cloned()
            .unwrap_or_else(|| local_name(type_id).to_string());

        let mut context = Map::new();
        context.insert("@vocab".to_string(), Value::String(vocab));
        if let Value::Object(structure) = self.walk(root) {
            context.extend(structure);
        }
        Ok(json!({ "@context": context }))
    }

    fn walk_inner(&self, node_id: &str, path: &mut HashSet<String>) -> Value {
        let Some(links) = self.outgoing.get(node_id) else {
            return extend_leaf();
        };
        if !path.insert(node_id.to_string()) {
            debug!(node = node_id, "cycle in graph; emitting leaf");
            return extend_leaf();
        }

        let mut out = Map::new();
        for link in links {
            let template = self.walk_inner(&link.target, path);
            out.insert(link.predicate.clone(), template);
        }
        path.remove(node_id);
        Value::Object(out)
    }
}

/// The "extend here" marker placed at the leaves of a template.
pub fn extend_leaf() -> Value {
    json!({ "@context": { "@extend": true } })
}
