//! Conversion of expanded documents into RDF triples.

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::*;

/// Walks expanded node objects and emits their triples, graph by graph.
///
/// Nodes without `@id` receive fresh blank-node labels. Subjects, predicates
/// and objects that are relative references are skipped.
pub struct RdfWriter {
    dataset: Dataset,
    next_blank: usize,
}

impl RdfWriter {
    pub fn new() -> Self {
        let mut dataset = Dataset::new();
        dataset.insert(DEFAULT_GRAPH.to_string(), Vec::new());
        Self {
            dataset,
            next_blank: 0,
        }
    }

    /// Converts a list of top-level expanded nodes.
    pub fn convert(mut self, nodes: &[Value]) -> Dataset {
        for node in nodes {
            if let Value::Object(map) = node {
                self.emit_node(map, DEFAULT_GRAPH);
            }
        }
        self.dataset
    }

    fn fresh_blank(&mut self) -> Term {
        let label = format!("_:b{}", self.next_blank);
        self.next_blank += 1;
        Term::blank(label)
    }

    fn push(&mut self, graph: &str, subject: &Term, predicate: &str, object: Term) {
        self.dataset
            .entry(graph.to_string())
            .or_default()
            .push(Triple {
                subject: subject.clone(),
                predicate: predicate.to_string(),
                object,
            });
    }

    /// Emits the triples of `node` and returns its subject term.
    fn emit_node(&mut self, node: &Map<String, Value>, graph: &str) -> Option<Term> {
        let subject = match node.get("@id").and_then(Value::as_str) {
            Some(id) if id.starts_with("_:") => Term::blank(id),
            Some(id) if is_absolute(id) => Term::iri(id),
            Some(id) => {
                debug!(id, "skipping node with relative identifier");
                return None;
            }
            None => self.fresh_blank(),
        };

        if let Some(Value::Array(types)) = node.get("@type") {
            for ty in types.iter().filter_map(Value::as_str) {
                if is_absolute(ty) {
                    self.push(graph, &subject, RDF_TYPE, Term::iri(ty));
                }
            }
        }

        if let Some(Value::Array(inner)) = node.get("@graph") {
            let name = subject.value().to_string();
            self.dataset.entry(name.clone()).or_default();
            for item in inner {
                if let Value::Object(map) = item {
                    self.emit_node(map, &name);
                }
            }
        }

        for (predicate, values) in node {
            if predicate.starts_with('@') {
                continue;
            }
            if !is_absolute(predicate) {
                debug!(predicate = predicate.as_str(), "skipping relative predicate");
                continue;
            }
            let Value::Array(values) = values else { continue };
            for value in values {
                if let Some(object) = self.object_term(value, graph) {
                    self.push(graph, &subject, predicate, object);
                }
            }
        }

        Some(subject)
    }

    fn object_term(&mut self, value: &Value, graph: &str) -> Option<Term> {
        let map = value.as_object()?;
        if let Some(literal) = map.get("@value") {
            return literal_term(literal, map);
        }
        if let Some(items) = map.get("@list") {
            let items = items.as_array().cloned().unwrap_or_default();
            return Some(self.emit_list(&items, graph));
        }
        self.emit_node(map, graph)
    }

    fn emit_list(&mut self, items: &[Value], graph: &str) -> Term {
        let objects: Vec<Term> = items
            .iter()
            .filter_map(|item| self.object_term(item, graph))
            .collect();
        if objects.is_empty() {
            return Term::iri(RDF_NIL);
        }
        let cells: Vec<Term> = objects.iter().map(|_| self.fresh_blank()).collect();
        for (i, object) in objects.into_iter().enumerate() {
            self.push(graph, &cells[i], RDF_FIRST, object);
            let rest = cells
                .get(i + 1)
                .cloned()
                .unwrap_or_else(|| Term::iri(RDF_NIL));
            self.push(graph, &cells[i], RDF_REST, rest);
        }
        cells[0].clone()
    }
}

impl Default for RdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_term(value: &Value, map: &Map<String, Value>) -> Option<Term> {
    let explicit = map.get("@type").and_then(Value::as_str);
    let language = map
        .get("@language")
        .and_then(Value::as_str)
        .map(str::to_string);
    let (lexical, implied) = match value {
        Value::String(s) => (s.clone(), XSD_STRING),
        Value::Bool(b) => (b.to_string(), XSD_BOOLEAN),
        Value::Number(n) if n.is_i64() || n.is_u64() => (n.to_string(), XSD_INTEGER),
        Value::Number(n) => (n.to_string(), XSD_DOUBLE),
        _ => return None,
    };
    let datatype = match (explicit, &language) {
        (Some(dt), _) => dt.to_string(),
        (None, Some(_)) => RDF_LANG_STRING.to_string(),
        (None, None) => implied.to_string(),
    };
    Some(Term::Literal {
        value: lexical,
        datatype,
        language,
    })
}

/// Whether `iri` carries a scheme (or registered prefix) and can name a resource.
pub fn is_absolute(iri: &str) -> bool {
    match iri.find(':') {
        Some(pos) if pos > 0 => {
            let scheme = &iri[..pos];
            scheme.as_bytes()[0].is_ascii_alphabetic()
                && scheme
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
        }
        _ => false,
    }
}

/// Renders a dataset as N-Quads.
pub fn to_nquads(dataset: &Dataset) -> String {
    let mut out = String::new();
    for (graph, triples) in dataset {
        for triple in triples {
            out.push_str(&render_term(&triple.subject));
            out.push(' ');
            out.push_str(&format!("<{}>", triple.predicate));
            out.push(' ');
            out.push_str(&render_term(&triple.object));
            if graph != DEFAULT_GRAPH {
                if graph.starts_with("_:") {
                    out.push_str(&format!(" {}", graph));
                } else {
                    out.push_str(&format!(" <{}>", graph));
                }
            }
            out.push_str(" .\n");
        }
    }
    out
}

fn render_term(term: &Term) -> String {
    match term {
        Term::Iri { value } => format!("<{}>", value),
        Term::Blank { value } => value.clone(),
        Term::Literal {
            value,
            datatype,
            language,
        } => {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            match language {
                Some(lang) => format!("\"{}\"@{}", escaped, lang),
                None if datatype == XSD_STRING => format!("\"{}\"", escaped),
                None => format!("\"{}\"^^<{}>", escaped, datatype),
            }
        }
    }
}
