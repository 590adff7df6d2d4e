use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::graph::store::corpus_checksum;
use crate::linked_data::LinkedDataProcessor;
use crate::loader::{load_all, DocumentLoader};
use crate::types::*;

/// Origin whose nodes are left out of the published node set.
const EXTERNAL_ORIGIN: &str = "https";

/// Converts a corpus of linked documents into a weighted node/link graph.
///
/// Every call is one sequential pass; nothing is cached between builds.
pub struct GraphBuilder<'a> {
    loader: &'a dyn DocumentLoader,
    processor: &'a dyn LinkedDataProcessor,
}

/// Nodes and links as emitted, before weighting and deduplication.
#[derive(Default)]
struct Emitted {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    /// Subject → RDF type, in first-seen subject order.
    type_map: Vec<(String, String)>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(loader: &'a dyn DocumentLoader, processor: &'a dyn LinkedDataProcessor) -> Self {
        Self { loader, processor }
    }

    /// Loads every location and builds the graph of the combined corpus.
    pub fn build(&self, locations: &[String]) -> Result<Graph> {
        let documents = load_all(self.loader, locations)?;
        self.build_from_documents(documents)
    }

    /// Builds the graph of an already loaded corpus.
    ///
    /// Conversion failures of the corpus as a whole propagate; individual
    /// triples that cannot be placed are skipped.
    pub fn build_from_documents(&self, documents: Vec<Value>) -> Result<Graph> {
        let combined = Value::Array(documents);
        let checksum = corpus_checksum(&combined);

        let expanded = self.processor.expand(&combined, None)?;
        let mut all_ids = BTreeSet::new();
        collect_ids(&expanded, &mut all_ids);

        let dataset = self.processor.to_rdf(&expanded)?;

        let mut emitted = Emitted::default();
        for triples in dataset.values() {
            for triple in triples {
                self.emit_triple(triple, &mut emitted);
            }
        }

        let type_map = dedup_last_wins(emitted.type_map, |(subject, _)| subject.clone());

        let node_weights = count_by(&emitted.nodes, |n| n.id.clone());
        let link_weights = count_by(&emitted.links, |l| (l.source.clone(), l.target.clone()));

        let mut nodes = emitted.nodes;
        for node in &mut nodes {
            node.weight = node_weights[&node.id];
        }
        let mut links = emitted.links;
        for link in &mut links {
            link.weight = link_weights[&(link.source.clone(), link.target.clone())];
        }

        let nodes = dedup_last_wins(nodes, |n| n.id.clone());
        let links = dedup_last_wins(links, |l| {
            (l.source.clone(), l.target.clone(), l.predicate.clone())
        });

        let declared: BTreeSet<&str> = type_map.iter().map(|(s, _)| s.as_str()).collect();
        let missing: Vec<String> = all_ids
            .into_iter()
            .filter(|id| !declared.contains(id.as_str()) && !dataset.contains_key(id))
            .collect();

        let mut types = BTreeMap::new();
        for (subject, rdf_type) in &type_map {
            types.insert(rdf_type.clone(), strip_last_segment(subject).to_string());
        }

        let vocab = types
            .keys()
            .filter(|t| !t.contains(EXTERNAL_ORIGIN))
            .map(|t| (t.clone(), local_name(t).to_string()))
            .collect();

        info!(
            nodes = nodes.len(),
            links = links.len(),
            types = types.len(),
            missing = missing.len(),
            "built dependency graph"
        );

        Ok(Graph {
            nodes,
            links,
            types,
            vocab,
            missing,
            checksum: Some(checksum),
        })
    }

    // ------------------------------------------------------------------
    // Private helpers
    // ------------------------------------------------------------------

    fn emit_triple(&self, triple: &Triple, out: &mut Emitted) {
        let (Some(subject), Some(object)) = (triple.subject.as_iri(), triple.object.as_iri()) else {
            if triple.subject.is_blank() || triple.object.is_blank() {
                debug!(predicate = triple.predicate.as_str(), "skipping blank-node triple");
            }
            return;
        };

        if triple.predicate == RDF_TYPE {
            out.type_map.push((subject.to_string(), object.to_string()));
            push_node(
                &mut out.nodes,
                GraphNode {
                    id: strip_last_segment(subject).to_string(),
                    node_type: object.to_string(),
                    origin: origin_of(subject).to_string(),
                    weight: 0,
                },
            );
            return;
        }

        let source = strip_last_segment(subject).to_string();
        out.links.push(GraphLink {
            source: source.clone(),
            target: strip_last_segment(object).to_string(),
            predicate: triple.predicate.clone(),
            weight: 0,
        });
        emit_breadcrumbs(&source, out);
    }
}

/// Emits the path-segment hierarchy leading to `source`:
/// `seg0 → seg1 → … → segN → source`, all with the hierarchy predicate.
fn emit_breadcrumbs(source: &str, out: &mut Emitted) {
    let segments: Vec<&str> = source
        .split([':', '/'])
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        warn!(source, "identifier has no path hierarchy; skipping breadcrumbs");
        return;
    }
    let origin = segments[0];

    for pair in segments.windows(2) {
        push_node(
            &mut out.nodes,
            GraphNode {
                id: pair[0].to_string(),
                node_type: DIRECTORY.to_string(),
                origin: origin.to_string(),
                weight: 0,
            },
        );
        out.links.push(GraphLink {
            source: pair[0].to_string(),
            target: pair[1].to_string(),
            predicate: HIERARCHY_PREDICATE.to_string(),
            weight: 0,
        });
    }

    let last = segments[segments.len() - 1];
    push_node(
        &mut out.nodes,
        GraphNode {
            id: last.to_string(),
            node_type: DIRECTORY_PATH.to_string(),
            origin: origin.to_string(),
            weight: 0,
        },
    );
    out.links.push(GraphLink {
        source: last.to_string(),
        target: source.to_string(),
        predicate: HIERARCHY_PREDICATE.to_string(),
        weight: 0,
    });
}

fn push_node(nodes: &mut Vec<GraphNode>, node: GraphNode) {
    if node.origin == EXTERNAL_ORIGIN {
        return;
    }
    nodes.push(node);
}

/// Drops the final `/`-separated segment: `ex:a/b/c` → `ex:a/b`.
/// An identifier without `/` strips to the empty string.
pub fn strip_last_segment(id: &str) -> &str {
    match id.rfind('/') {
        Some(pos) => &id[..pos],
        None => "",
    }
}

/// The scheme or prefix token before the first `:`.
pub fn origin_of(id: &str) -> &str {
    id.split(':').next().unwrap_or(id)
}

/// The local part of a type identifier: whatever follows the last `#`, `/`
/// or `:`.
pub fn local_name(id: &str) -> &str {
    match id.rfind(['#', '/', ':']) {
        Some(pos) => &id[pos + 1..],
        None => id,
    }
}

/// Collects every non-blank `@id` string in an expanded structure.
fn collect_ids(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_ids(item, ids);
            }
        }
        Value::Object(map) => {
            for (key, inner) in map {
                if key == "@id" {
                    if let Some(id) = inner.as_str() {
                        if !id.starts_with("_:") {
                            ids.insert(id.to_string());
                        }
                    }
                } else {
                    collect_ids(inner, ids);
                }
            }
        }
        _ => {}
    }
}

fn count_by<T, K: Eq + Hash>(items: &[T], key: impl Fn(&T) -> K) -> HashMap<K, usize> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

/// Deduplicates by key: each key keeps the position where it was first seen
/// and the content it was last given.
fn dedup_last_wins<T, K: Eq + Hash>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::new();
    for item in items {
        match index.entry(key(&item)) {
            Entry::Occupied(slot) => out[*slot.get()] = item,
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(item);
            }
        }
    }
    out
}
