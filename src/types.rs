use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// IRI of the RDF "type" relation.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

/// Name under which the default graph appears in a [`Dataset`].
pub const DEFAULT_GRAPH: &str = "@default";

/// Node type given to synthetic path-segment nodes.
pub const DIRECTORY: &str = "directory";
/// Node type given to the last path segment, which links back to its source.
pub const DIRECTORY_PATH: &str = "directory-path";
/// Predicate of synthetic hierarchy links.
pub const HIERARCHY_PREDICATE: &str = "_";

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Term {
    Iri {
        value: String,
    },
    Blank {
        value: String,
    },
    Literal {
        value: String,
        datatype: String,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri {
            value: value.into(),
        }
    }

    pub fn blank(value: impl Into<String>) -> Self {
        Term::Blank {
            value: value.into(),
        }
    }

    /// The lexical value of the term, whatever its kind.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri { value } | Term::Blank { value } | Term::Literal { value, .. } => value,
        }
    }

    /// Returns the IRI when this term is one.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank { .. })
    }
}

/// A subject/predicate/object fact extracted from an expanded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// Triples grouped by graph name; the default graph is [`DEFAULT_GRAPH`].
pub type Dataset = BTreeMap<String, Vec<Triple>>;

/// A node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Subject identifier with its last path segment stripped, or a path segment.
    pub id: String,
    /// RDF type of the subject, [`DIRECTORY`] or [`DIRECTORY_PATH`].
    #[serde(rename = "type")]
    pub node_type: String,
    /// Scheme or prefix token preceding the first `:`.
    pub origin: String,
    /// Number of times the id was emitted before deduplication.
    pub weight: usize,
}

/// A link of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    /// Semantic predicate IRI, or [`HIERARCHY_PREDICATE`] for breadcrumb links.
    pub predicate: String,
    /// Number of links emitted between the same source and target.
    pub weight: usize,
}

impl GraphLink {
    pub fn is_hierarchy(&self) -> bool {
        self.predicate == HIERARCHY_PREDICATE
    }
}

/// Weighted node/link graph derived from a document corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    /// RDF type → representative location.
    pub types: BTreeMap<String, String>,
    /// Internally registered type → local vocabulary name.
    pub vocab: BTreeMap<String, String>,
    /// Referenced identifiers with no declared type and no loaded document.
    pub missing: Vec<String>,
    /// SHA-256 of the corpus the graph was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Graph {
    /// Returns the node with the given id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns all links leaving `source`, in graph order.
    pub fn outgoing(&self, source: &str) -> Vec<&GraphLink> {
        self.links.iter().filter(|l| l.source == source).collect()
    }

    /// Returns `true` if a link `source → target` exists with any predicate.
    pub fn has_link(&self, source: &str, target: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.source == source && l.target == target)
    }
}

/// Reference integrity of a single document entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLinks {
    /// Identifier of the checked entry.
    pub id: String,
    /// Every identifier the entry references.
    pub all_links: BTreeSet<String>,
    /// Referenced identifiers that could not be dereferenced.
    pub broken_links: Vec<String>,
}

/// A document the link checker could not process at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub location: String,
    pub message: String,
}

/// Result of checking a corpus for broken references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub entries: Vec<EntryLinks>,
    pub failures: Vec<DocumentFailure>,
}

impl LinkReport {
    /// Number of broken references across all entries.
    pub fn broken_count(&self) -> usize {
        self.entries.iter().map(|e| e.broken_links.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.broken_count() == 0 && self.failures.is_empty()
    }

    /// Inverts the report into `broken target → referencing entries`.
    pub fn broken_by_target(&self) -> BTreeMap<String, Vec<String>> {
        let mut reverse: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            for broken in &entry.broken_links {
                reverse
                    .entry(broken.clone())
                    .or_default()
                    .push(entry.id.clone());
            }
        }
        reverse
    }
}
