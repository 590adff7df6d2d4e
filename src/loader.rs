//! Document loading: filesystem paths, HTTP(S) URLs and registry prefixes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::VocabGraphConfig;
use crate::errors::{Result, VocabGraphError};
use crate::linked_data::rebase_context;
use crate::registry::Registry;

const ACCEPT: &str = "application/ld+json, application/json;q=0.9";

/// Fetches and parses a single document.
///
/// Implementations must be shareable across worker threads. A location that
/// cannot be produced is reported as [`VocabGraphError::NotFound`].
pub trait DocumentLoader: Send + Sync {
    fn load(&self, location: &str) -> Result<Value>;
}

impl<T: DocumentLoader + ?Sized> DocumentLoader for Arc<T> {
    fn load(&self, location: &str) -> Result<Value> {
        (**self).load(location)
    }
}

/// Loads every location and concatenates the results into one array.
///
/// Array documents are spliced in; any other document is appended whole.
/// Relative `@context` references are made absolute against the location
/// they were loaded from, so the combined corpus expands without a base.
/// Fails on the first location that cannot be loaded.
pub fn load_all(loader: &dyn DocumentLoader, locations: &[String]) -> Result<Vec<Value>> {
    let mut combined = Vec::new();
    for location in locations {
        match loader.load(location)? {
            Value::Array(items) => combined.extend(
                items
                    .into_iter()
                    .map(|item| rebase_document(item, location)),
            ),
            other => combined.push(rebase_document(other, location)),
        }
    }
    Ok(combined)
}

fn rebase_document(document: Value, location: &str) -> Value {
    match document {
        Value::Object(mut map) => {
            if let Some(context) = map.remove("@context") {
                map.insert("@context".to_string(), rebase_context(context, location));
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Returns `true` for `http://` and `https://` locations.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolves `reference` against the location of the document naming it.
///
/// Absolute references (anything with a scheme) are returned unchanged.
pub fn join_location(base: &str, reference: &str) -> String {
    if reference.contains("://") || base.is_empty() {
        return reference.to_string();
    }
    if is_remote(base) || base.starts_with("file://") {
        let trimmed = base.split('#').next().unwrap_or(base);
        let dir = match trimmed.rfind('/') {
            Some(i) => &trimmed[..=i],
            None => trimmed,
        };
        return format!("{}{}", dir, reference);
    }
    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    parent.join(reference).to_string_lossy().to_string()
}

/// Loader used by the CLI and the orchestrator.
///
/// Registry prefixes are expanded first; remote locations are fetched with
/// bounded retries, everything else is read from disk (relative paths are
/// taken from `root`).
pub struct DefaultLoader {
    registry: Arc<Registry>,
    agent: ureq::Agent,
    retries: u32,
    root: Option<PathBuf>,
}

impl DefaultLoader {
    pub fn new(registry: Arc<Registry>, config: &VocabGraphConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.fetch_timeout_secs)))
            .build()
            .into();
        Self {
            registry,
            agent,
            retries: config.fetch_retries.max(1),
            root: None,
        }
    }

    /// Resolves relative filesystem locations against `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    fn fetch_remote(&self, url: &str) -> Result<Value> {
        let mut last_error = String::new();
        for attempt in 1..=self.retries {
            match self.agent.get(url).header("Accept", ACCEPT).call() {
                Ok(mut response) => {
                    return response.body_mut().read_json::<Value>().map_err(|e| {
                        VocabGraphError::linked_data(format!("invalid JSON from '{}': {}", url, e))
                    });
                }
                Err(ureq::Error::StatusCode(status)) if status == 404 || status == 410 => {
                    return Err(VocabGraphError::not_found(
                        url,
                        format!("server answered {}", status),
                    ));
                }
                Err(e) => {
                    debug!(url, attempt, error = %e, "fetch attempt failed");
                    last_error = e.to_string();
                }
            }
        }
        warn!(url, retries = self.retries, "giving up on remote document");
        Err(VocabGraphError::not_found(url, last_error))
    }

    fn read_file(&self, location: &str) -> Result<Value> {
        let raw = location.strip_prefix("file://").unwrap_or(location);
        let mut path = PathBuf::from(raw);
        if path.is_relative() {
            if let Some(root) = &self.root {
                path = root.join(path);
            }
        }
        if !path.is_file() {
            return Err(VocabGraphError::not_found(location, "no such document"));
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| {
            VocabGraphError::linked_data(format!("invalid JSON in '{}': {}", path.display(), e))
        })
    }
}

impl DocumentLoader for DefaultLoader {
    fn load(&self, location: &str) -> Result<Value> {
        let resolved = self.registry.resolve_location(location);
        if is_remote(&resolved) {
            self.fetch_remote(&resolved)
        } else {
            self.read_file(&resolved)
        }
    }
}

/// In-process corpus keyed by location.
///
/// Counts every load request, which makes fetch behaviour observable.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    documents: HashMap<String, Value>,
    fetches: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `document` under `location`, replacing any previous one.
    pub fn insert(&mut self, location: impl Into<String>, document: Value) {
        self.documents.insert(location.into(), document);
    }

    pub fn with(mut self, location: impl Into<String>, document: Value) -> Self {
        self.insert(location, document);
        self
    }

    /// Number of load requests served so far, including misses.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, location: &str) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| VocabGraphError::not_found(location, "no such document"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_location() {
        assert_eq!(
            join_location("https://ex.org/a/doc.json", "_context_"),
            "https://ex.org/a/_context_"
        );
        assert_eq!(
            join_location("https://ex.org/a/doc.json", "https://other.org/ctx"),
            "https://other.org/ctx"
        );
        assert_eq!(
            join_location("data/a/doc.json", "_context_"),
            "data/a/_context_"
        );
    }

    #[test]
    fn test_load_all_rebases_relative_contexts() {
        let loader = MemoryLoader::new()
            .with(
                "https://ex.org/a/one.json",
                serde_json::json!({"@context": "_context_", "@id": "ex:one"}),
            )
            .with(
                "https://ex.org/b/many.json",
                serde_json::json!([
                    {"@context": ["../shared.json", {"x": "https://ex.org/x"}], "@id": "ex:two"},
                    {"@id": "ex:three"}
                ]),
            );
        let documents = load_all(
            &loader,
            &[
                "https://ex.org/a/one.json".to_string(),
                "https://ex.org/b/many.json".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0]["@context"], "https://ex.org/a/_context_");
        assert_eq!(documents[1]["@context"][0], "https://ex.org/b/../shared.json");
        assert_eq!(documents[1]["@context"][1]["x"], "https://ex.org/x");
        assert!(documents[2].get("@context").is_none());
    }
}
