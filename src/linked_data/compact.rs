//! Compaction of expanded documents against a context.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::context::{ActiveContext, TermDefinition, TypeMapping};

/// Reverse lookup tables built once per compaction.
///
/// Namespace prefixes are sorted longest-first so the most specific prefix
/// always wins.
pub struct Compactor<'a> {
    ctx: &'a ActiveContext,
    by_iri: HashMap<&'a str, Vec<(&'a str, &'a TermDefinition)>>,
    prefixes: Vec<(&'a str, &'a str)>,
}

impl<'a> Compactor<'a> {
    pub fn new(ctx: &'a ActiveContext) -> Self {
        let mut by_iri: HashMap<&str, Vec<(&str, &TermDefinition)>> = HashMap::new();
        let mut prefixes: Vec<(&str, &str)> = Vec::new();

        for (term, def) in &ctx.terms {
            by_iri
                .entry(def.iri.as_str())
                .or_default()
                .push((term.as_str(), def));
            if (def.iri.ends_with('/') || def.iri.ends_with('#'))
                && def.type_mapping == TypeMapping::None
                && !def.list
            {
                prefixes.push((def.iri.as_str(), term.as_str()));
            }
        }
        for candidates in by_iri.values_mut() {
            candidates.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then(a.0.cmp(b.0)));
        }
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.1.cmp(b.1)));

        Self {
            ctx,
            by_iri,
            prefixes,
        }
    }

    /// Compacts an IRI. `values` (the expanded values of a property) steer
    /// the choice between terms sharing the same IRI.
    pub fn compact_iri(&self, iri: &str, vocab: bool, values: Option<&[Value]>) -> String {
        if iri.starts_with('@') {
            return iri.to_string();
        }
        if vocab {
            if let Some(term) = self.select_term(iri, values) {
                return term.to_string();
            }
            if let Some(v) = &self.ctx.vocab {
                if let Some(suffix) = iri.strip_prefix(v.as_str()) {
                    if !suffix.is_empty()
                        && !suffix.contains(':')
                        && self.ctx.term(suffix).is_none()
                    {
                        return suffix.to_string();
                    }
                }
            }
        }
        for (prefix_iri, term) in &self.prefixes {
            if let Some(suffix) = iri.strip_prefix(prefix_iri) {
                if !suffix.is_empty() {
                    return format!("{}:{}", term, suffix);
                }
            }
        }
        iri.to_string()
    }

    fn select_term(&self, iri: &str, values: Option<&[Value]>) -> Option<&'a str> {
        let candidates = self.by_iri.get(iri)?;
        let values = values.unwrap_or(&[]);

        // A term whose type mapping matches the values beats a plain one.
        let typed = candidates
            .iter()
            .find(|(_, def)| def.type_mapping != TypeMapping::None && term_fits(def, values));
        if let Some((term, _)) = typed {
            return Some(*term);
        }
        candidates
            .iter()
            .find(|(_, def)| def.type_mapping == TypeMapping::None && term_fits(def, values))
            .map(|(term, _)| *term)
    }

    /// Compacts one expanded node object.
    pub fn compact_node(&self, node: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in node {
            match key.as_str() {
                "@id" => {
                    let id = value.as_str().unwrap_or_default();
                    out.insert(key.clone(), Value::String(self.compact_iri(id, false, None)));
                }
                "@type" => {
                    let types: Vec<Value> = as_slice(value)
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|t| Value::String(self.compact_iri(t, true, None)))
                        .collect();
                    out.insert(key.clone(), compact_array(types));
                }
                "@graph" => {
                    let nodes = as_slice(value)
                        .iter()
                        .map(|v| self.compact_element(v, None))
                        .collect();
                    out.insert(key.clone(), Value::Array(nodes));
                }
                k if k.starts_with('@') => {
                    out.insert(key.clone(), value.clone());
                }
                property => {
                    let values = as_slice(value);
                    let name = self.compact_iri(property, true, Some(values));
                    let def = self
                        .ctx
                        .term(&name)
                        .filter(|d| d.iri == property);
                    let compacted = if def.is_some_and(|d| d.list) && values.len() == 1 {
                        self.compact_element(&values[0], def)
                    } else {
                        compact_array(
                            values
                                .iter()
                                .map(|v| self.compact_element(v, def))
                                .collect(),
                        )
                    };
                    merge_into(&mut out, name, compacted);
                }
            }
        }
        out
    }

    /// Compacts any expanded value under the term that holds it.
    pub fn compact_element(&self, value: &Value, term: Option<&TermDefinition>) -> Value {
        let map = match value {
            Value::Object(map) => map,
            Value::Array(items) => {
                return Value::Array(items.iter().map(|v| self.compact_element(v, term)).collect())
            }
            scalar => return scalar.clone(),
        };

        if let Some(inner) = map.get("@value") {
            return self.compact_value_object(map, inner, term);
        }

        if let Some(items) = map.get("@list") {
            let items: Vec<Value> = as_slice(items)
                .iter()
                .map(|v| self.compact_element(v, term))
                .collect();
            if term.is_some_and(|t| t.list) {
                return Value::Array(items);
            }
            let mut out = Map::new();
            out.insert("@list".to_string(), Value::Array(items));
            return Value::Object(out);
        }

        if map.len() == 1 {
            if let Some(id) = map.get("@id").and_then(Value::as_str) {
                return match term.map(|t| &t.type_mapping) {
                    Some(TypeMapping::Id) => Value::String(self.compact_iri(id, false, None)),
                    Some(TypeMapping::Vocab) => Value::String(self.compact_iri(id, true, None)),
                    _ => {
                        let mut out = Map::new();
                        out.insert(
                            "@id".to_string(),
                            Value::String(self.compact_iri(id, false, None)),
                        );
                        Value::Object(out)
                    }
                };
            }
        }

        Value::Object(self.compact_node(map))
    }

    fn compact_value_object(
        &self,
        map: &Map<String, Value>,
        inner: &Value,
        term: Option<&TermDefinition>,
    ) -> Value {
        let datatype = map.get("@type").and_then(Value::as_str);
        let language = map.get("@language");
        let mapped = match term.map(|t| &t.type_mapping) {
            Some(TypeMapping::Datatype(dt)) => Some(dt.as_str()),
            _ => None,
        };
        if language.is_none() && datatype == mapped {
            return inner.clone();
        }
        let mut out = Map::new();
        out.insert("@value".to_string(), inner.clone());
        if let Some(dt) = datatype {
            out.insert(
                "@type".to_string(),
                Value::String(self.compact_iri(dt, true, None)),
            );
        }
        if let Some(lang) = language {
            out.insert("@language".to_string(), lang.clone());
        }
        Value::Object(out)
    }
}

/// Whether a term definition can represent all of `values`.
fn term_fits(def: &TermDefinition, values: &[Value]) -> bool {
    if def.list {
        return values.len() == 1 && values[0].get("@list").is_some();
    }
    if values.iter().any(|v| v.get("@list").is_some()) {
        return false;
    }
    match &def.type_mapping {
        TypeMapping::None => true,
        TypeMapping::Id | TypeMapping::Vocab => !values.is_empty() && values.iter().all(is_node),
        TypeMapping::Datatype(dt) => {
            !values.is_empty()
                && values
                    .iter()
                    .all(|v| v.get("@type").and_then(Value::as_str) == Some(dt.as_str()))
        }
    }
}

/// A node object carrying an `@id`, bare reference or embedded node alike.
fn is_node(value: &Value) -> bool {
    value.as_object().is_some_and(|m| {
        m.contains_key("@id") && !m.contains_key("@value") && !m.contains_key("@list")
    })
}

fn as_slice(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Array compaction: a single element stands for itself.
fn compact_array(mut items: Vec<Value>) -> Value {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Value::Array(items)
    }
}

fn merge_into(out: &mut Map<String, Value>, key: String, value: Value) {
    match out.remove(&key) {
        None => {
            out.insert(key, value);
        }
        Some(existing) => {
            let mut merged = match existing {
                Value::Array(items) => items,
                other => vec![other],
            };
            match value {
                Value::Array(items) => merged.extend(items),
                other => merged.push(other),
            }
            out.insert(key, Value::Array(merged));
        }
    }
}
