//! Active context: term definitions, `@vocab` and `@base`.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::errors::{Result, VocabGraphError};
use crate::loader::join_location;

/// Remote contexts may reference further remote contexts; stop here.
const MAX_CONTEXT_DEPTH: usize = 8;

/// How the values of a term are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeMapping {
    #[default]
    None,
    /// String values are identifiers (`"@type": "@id"`).
    Id,
    /// String values are vocabulary terms (`"@type": "@vocab"`).
    Vocab,
    /// String values are literals of this datatype.
    Datatype(String),
}

/// A single term definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermDefinition {
    pub iri: String,
    pub type_mapping: TypeMapping,
    pub list: bool,
}

/// Fetches remote contexts referenced by string.
pub trait ContextSource {
    fn fetch_context(&self, location: &str) -> Result<Value>;
}

/// The context in effect while expanding or compacting a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveContext {
    pub terms: HashMap<String, TermDefinition>,
    pub vocab: Option<String>,
    pub base: Option<String>,
}

impl ActiveContext {
    pub fn new(base: Option<&str>) -> Self {
        Self {
            base: base.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn term(&self, name: &str) -> Option<&TermDefinition> {
        self.terms.get(name)
    }

    /// Processes a local context on top of this one.
    pub fn parse(&self, local: &Value, source: &dyn ContextSource) -> Result<ActiveContext> {
        self.parse_nested(local, source, 0)
    }

    fn parse_nested(
        &self,
        local: &Value,
        source: &dyn ContextSource,
        depth: usize,
    ) -> Result<ActiveContext> {
        if depth > MAX_CONTEXT_DEPTH {
            return Err(VocabGraphError::linked_data(
                "remote context nesting too deep",
            ));
        }
        match local {
            Value::Null => Ok(ActiveContext::new(self.base.as_deref())),
            Value::Array(items) => {
                let mut ctx = self.clone();
                for item in items {
                    ctx = ctx.parse_nested(item, source, depth)?;
                }
                Ok(ctx)
            }
            Value::String(reference) => {
                let location = match &self.base {
                    Some(base) => join_location(base, reference),
                    None => reference.clone(),
                };
                let remote = source.fetch_context(&location)?;
                let inner = match remote {
                    Value::Object(mut map) => map.remove("@context").unwrap_or(Value::Null),
                    other => {
                        return Err(VocabGraphError::linked_data(format!(
                            "remote context '{}' is not an object: {}",
                            location, other
                        )))
                    }
                };
                let mut ctx = ActiveContext {
                    base: Some(location),
                    ..self.clone()
                };
                ctx = ctx.parse_nested(&inner, source, depth + 1)?;
                ctx.base = self.base.clone();
                Ok(ctx)
            }
            Value::Object(map) => self.parse_object(map),
            other => Err(VocabGraphError::linked_data(format!(
                "invalid local context: {}",
                other
            ))),
        }
    }

    fn parse_object(&self, map: &Map<String, Value>) -> Result<ActiveContext> {
        let mut ctx = self.clone();

        if let Some(base) = map.get("@base") {
            ctx.base = base.as_str().map(str::to_string);
        }
        if let Some(vocab) = map.get("@vocab") {
            ctx.vocab = match vocab.as_str() {
                Some(v) => Some(expand_with(v, map, &ctx)),
                None => None,
            };
        }

        for (term, definition) in map {
            if term.starts_with('@') {
                continue;
            }
            match definition {
                Value::Null => {
                    ctx.terms.remove(term);
                }
                Value::String(iri) => {
                    let iri = expand_with(iri, map, &ctx);
                    ctx.terms.insert(
                        term.clone(),
                        TermDefinition {
                            iri,
                            ..Default::default()
                        },
                    );
                }
                Value::Object(def) => {
                    let iri = match def.get("@id").and_then(Value::as_str) {
                        Some(id) => expand_with(id, map, &ctx),
                        None => expand_with(term, map, &ctx),
                    };
                    let type_mapping = match def.get("@type").and_then(Value::as_str) {
                        Some("@id") => TypeMapping::Id,
                        Some("@vocab") => TypeMapping::Vocab,
                        Some(datatype) => TypeMapping::Datatype(expand_with(datatype, map, &ctx)),
                        None => TypeMapping::None,
                    };
                    let list = def.get("@container").and_then(Value::as_str) == Some("@list");
                    ctx.terms.insert(
                        term.clone(),
                        TermDefinition {
                            iri,
                            type_mapping,
                            list,
                        },
                    );
                }
                other => {
                    return Err(VocabGraphError::linked_data(format!(
                        "invalid definition for term '{}': {}",
                        term, other
                    )))
                }
            }
        }
        Ok(ctx)
    }

    /// Expands a term, compact IRI or relative reference.
    ///
    /// With `vocab` set, bare terms are looked up in the term table and then
    /// appended to `@vocab`; otherwise they are joined to `@base`. Values that
    /// cannot be expanded are returned as given.
    pub fn expand_iri(&self, value: &str, vocab: bool) -> String {
        if value.starts_with('@') || value.starts_with("_:") {
            return value.to_string();
        }
        if vocab {
            if let Some(def) = self.terms.get(value) {
                return def.iri.clone();
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if suffix.starts_with("//") {
                return value.to_string();
            }
            if let Some(def) = self.terms.get(prefix) {
                return format!("{}{}", def.iri, suffix);
            }
            return value.to_string();
        }
        if vocab {
            if let Some(v) = &self.vocab {
                return format!("{}{}", v, value);
            }
        } else if let Some(base) = &self.base {
            return join_location(base, value);
        }
        value.to_string()
    }
}

/// Expands a value used inside the context being defined, allowing it to
/// refer to prefixes declared alongside it.
fn expand_with(value: &str, local: &Map<String, Value>, ctx: &ActiveContext) -> String {
    if let Some((prefix, suffix)) = value.split_once(':') {
        if !suffix.starts_with("//") {
            if let Some(prefix_iri) = local.get(prefix).and_then(prefix_target) {
                if prefix_iri != value {
                    return format!("{}{}", prefix_iri, suffix);
                }
            }
        }
    }
    ctx.expand_iri(value, true)
}

fn prefix_target(definition: &Value) -> Option<&str> {
    match definition {
        Value::String(s) => Some(s),
        Value::Object(def) => def.get("@id").and_then(Value::as_str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoRemote;

    impl ContextSource for NoRemote {
        fn fetch_context(&self, location: &str) -> Result<Value> {
            Err(VocabGraphError::not_found(location, "offline"))
        }
    }

    #[test]
    fn test_prefix_and_vocab_expansion() {
        let ctx = ActiveContext::new(None)
            .parse(
                &json!({
                    "@vocab": "https://ex.org/vocab/",
                    "ex": "https://ex.org/",
                    "name": "ex:name",
                    "parent": {"@id": "ex:parent", "@type": "@id"}
                }),
                &NoRemote,
            )
            .unwrap();

        assert_eq!(ctx.expand_iri("name", true), "https://ex.org/name");
        assert_eq!(ctx.expand_iri("ex:thing", false), "https://ex.org/thing");
        assert_eq!(ctx.expand_iri("label", true), "https://ex.org/vocab/label");
        assert_eq!(ctx.expand_iri("label", false), "label");
        assert_eq!(ctx.term("parent").unwrap().type_mapping, TypeMapping::Id);
    }

    #[test]
    fn test_null_context_resets_terms() {
        let ctx = ActiveContext::new(None)
            .parse(&json!({"ex": "https://ex.org/"}), &NoRemote)
            .unwrap();
        let reset = ctx.parse(&Value::Null, &NoRemote).unwrap();
        assert!(reset.terms.is_empty());
    }

    #[test]
    fn test_remote_context_failure_is_reported() {
        let err = ActiveContext::new(None)
            .parse(&json!("https://ex.org/ctx"), &NoRemote)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
