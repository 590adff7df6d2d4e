//! Prefix registry: maps short-form `prefix:path` identifiers to absolute
//! base identifiers and back.

use crate::config::{PrefixMapping, VocabGraphConfig};

/// Name of the compiled graph a bare prefix refers to.
const COMPILED_GRAPH: &str = "graph.jsonld";

/// Ordered prefix ↔ base table.
///
/// Entries are kept sorted by prefix length (shortest first); entries of equal
/// length keep their insertion order. The table is immutable once built and
/// is shared read-only between resolvers and builders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<PrefixMapping>,
}

impl Registry {
    /// Builds a registry from `(prefix, base)` pairs.
    pub fn new<I, P, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<String>,
    {
        let mut entries: Vec<PrefixMapping> = pairs
            .into_iter()
            .map(|(prefix, base)| PrefixMapping {
                prefix: prefix.into(),
                base: base.into(),
            })
            .collect();
        // sort_by_key is stable, which gives the insertion-order tie-break.
        entries.sort_by_key(|e| e.prefix.len());
        Self { entries }
    }

    /// Builds the registry declared in a project configuration.
    pub fn from_config(config: &VocabGraphConfig) -> Self {
        Self::new(
            config
                .prefixes
                .iter()
                .map(|m| (m.prefix.clone(), m.base.clone())),
        )
    }

    /// Registered mappings in lookup order.
    pub fn prefixes(&self) -> &[PrefixMapping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the base identifier registered for `prefix`, if any.
    pub fn base_for(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.prefix == prefix)
            .map(|e| e.base.as_str())
    }

    /// Expands a `prefix:rest` short form into `base + rest`.
    ///
    /// Absolute identifiers and unregistered prefixes are returned unchanged.
    pub fn resolve(&self, id: &str) -> String {
        if let Some((prefix, rest)) = split_short_form(id) {
            if let Some(base) = self.base_for(prefix) {
                return format!("{}{}", base, rest);
            }
        }
        id.to_string()
    }

    /// Shortens an absolute identifier to `prefix:rest` using the first
    /// registered base that is a string prefix of `id`.
    ///
    /// Identifiers no base matches are returned unchanged.
    pub fn compact(&self, id: &str) -> String {
        for entry in &self.entries {
            if let Some(rest) = id.strip_prefix(entry.base.as_str()) {
                return format!("{}:{}", entry.prefix, rest);
            }
        }
        id.to_string()
    }

    /// Resolves a location the way document loaders see it.
    ///
    /// A bare registered prefix (`cmip7` or `cmip7:`) names that prefix's
    /// compiled graph; anything else goes through [`Registry::resolve`].
    pub fn resolve_location(&self, location: &str) -> String {
        let bare = location.strip_suffix(':').unwrap_or(location);
        if let Some(base) = self.base_for(bare) {
            return format!("{}{}", base, COMPILED_GRAPH);
        }
        self.resolve(location)
    }
}

/// Splits `prefix:rest` when it is a short form rather than an absolute IRI.
fn split_short_form(id: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = id.split_once(':')?;
    if prefix.is_empty() || prefix.contains('/') || rest.starts_with("//") {
        return None;
    }
    Some((prefix, rest))
}
