//! Document expansion: every key becomes an absolute IRI or keyword, every
//! property value becomes an array of node, value or list objects.

use serde_json::{Map, Value};
use tracing::debug;

use super::context::{ActiveContext, ContextSource, TermDefinition, TypeMapping};
use crate::errors::{Result, VocabGraphError};

/// Expands `input` into an array of top-level node objects.
pub fn expand_document(
    input: &Value,
    ctx: &ActiveContext,
    source: &dyn ContextSource,
) -> Result<Vec<Value>> {
    let expanded = expand_element(input, ctx, None, source)?;
    let items = match expanded {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    };

    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Object(map) if is_graph_wrapper(&map) => {
                if let Some(Value::Array(nodes)) = map.get("@graph") {
                    out.extend(nodes.iter().cloned());
                }
            }
            // Free-floating values and lists carry no subject.
            Value::Object(map) if map.contains_key("@value") || map.contains_key("@list") => {}
            Value::Object(map) => out.push(Value::Object(map)),
            _ => {}
        }
    }
    Ok(out)
}

/// A top-level object holding nothing but `@graph`.
fn is_graph_wrapper(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.contains_key("@graph")
}

fn expand_element(
    element: &Value,
    ctx: &ActiveContext,
    term: Option<&TermDefinition>,
    source: &dyn ContextSource,
) -> Result<Option<Value>> {
    match element {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match expand_element(item, ctx, term, source)? {
                    Some(Value::Array(nested)) => out.extend(nested),
                    Some(value) => out.push(value),
                    None => {}
                }
            }
            Ok(Some(Value::Array(out)))
        }
        Value::Object(map) => expand_object(map, ctx, source).map(Some),
        scalar => Ok(Some(expand_value(scalar, ctx, term))),
    }
}

/// Expands a scalar according to its term's type mapping.
fn expand_value(value: &Value, ctx: &ActiveContext, term: Option<&TermDefinition>) -> Value {
    let mapping = term.map(|t| &t.type_mapping).unwrap_or(&TypeMapping::None);
    let mut out = Map::new();
    match (mapping, value) {
        (TypeMapping::Id, Value::String(s)) => {
            out.insert("@id".to_string(), Value::String(ctx.expand_iri(s, false)));
        }
        (TypeMapping::Vocab, Value::String(s)) => {
            out.insert("@id".to_string(), Value::String(ctx.expand_iri(s, true)));
        }
        (TypeMapping::Datatype(datatype), _) => {
            out.insert("@value".to_string(), value.clone());
            out.insert("@type".to_string(), Value::String(datatype.clone()));
        }
        _ => {
            out.insert("@value".to_string(), value.clone());
        }
    }
    Value::Object(out)
}

fn expand_object(
    map: &Map<String, Value>,
    ctx: &ActiveContext,
    source: &dyn ContextSource,
) -> Result<Value> {
    let ctx = match map.get("@context") {
        Some(local) => ctx.parse(local, source)?,
        None => ctx.clone(),
    };

    if map.contains_key("@value") {
        return expand_value_object(map, &ctx);
    }

    if let Some(items) = map.get("@list") {
        let expanded = expand_element(items, &ctx, None, source)?.unwrap_or(Value::Array(vec![]));
        let mut out = Map::new();
        out.insert("@list".to_string(), as_array(expanded));
        return Ok(Value::Object(out));
    }

    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            "@context" => {}
            "@id" => {
                let id = value.as_str().ok_or_else(|| {
                    VocabGraphError::linked_data(format!("@id must be a string, got {}", value))
                })?;
                out.insert("@id".to_string(), Value::String(ctx.expand_iri(id, false)));
            }
            "@type" => {
                let types = expand_types(value, &ctx)?;
                out.insert("@type".to_string(), Value::Array(types));
            }
            "@graph" => {
                let nodes = expand_element(value, &ctx, None, source)?.unwrap_or(Value::Null);
                out.insert("@graph".to_string(), as_array(nodes));
            }
            k if k.starts_with('@') => {
                debug!(keyword = k, "ignoring unsupported keyword");
            }
            property => {
                let iri = ctx.expand_iri(property, true);
                if !iri.contains(':') {
                    debug!(property, "dropping property that does not expand to an IRI");
                    continue;
                }
                let term = ctx.term(property);
                let mut expanded = match expand_element(value, &ctx, term, source)? {
                    Some(v) => as_array(v),
                    None => continue,
                };
                if term.map(|t| t.list).unwrap_or(false) && !is_single_list(&expanded) {
                    let mut list = Map::new();
                    list.insert("@list".to_string(), expanded);
                    expanded = Value::Array(vec![Value::Object(list)]);
                }
                match out.get_mut(&iri) {
                    Some(Value::Array(existing)) => {
                        if let Value::Array(more) = expanded {
                            existing.extend(more);
                        }
                    }
                    _ => {
                        out.insert(iri, expanded);
                    }
                }
            }
        }
    }
    Ok(Value::Object(out))
}

fn expand_value_object(map: &Map<String, Value>, ctx: &ActiveContext) -> Result<Value> {
    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            "@value" | "@language" => {
                out.insert(key.clone(), value.clone());
            }
            "@type" => {
                let datatype = value.as_str().ok_or_else(|| {
                    VocabGraphError::linked_data("value object @type must be a string")
                })?;
                out.insert(
                    "@type".to_string(),
                    Value::String(ctx.expand_iri(datatype, true)),
                );
            }
            _ => {}
        }
    }
    if out.contains_key("@type") && out.contains_key("@language") {
        return Err(VocabGraphError::linked_data(
            "@language cannot be used for values with a specified @type",
        ));
    }
    Ok(Value::Object(out))
}

fn expand_types(value: &Value, ctx: &ActiveContext) -> Result<Vec<Value>> {
    let raw: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    raw.into_iter()
        .map(|t| {
            t.as_str()
                .map(|s| Value::String(ctx.expand_iri(s, true)))
                .ok_or_else(|| VocabGraphError::linked_data(format!("@type must be a string, got {}", t)))
        })
        .collect()
}

fn is_single_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => {
            items.len() == 1 && items[0].as_object().is_some_and(|m| m.contains_key("@list"))
        }
        _ => false,
    }
}

fn as_array(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other]),
    }
}
