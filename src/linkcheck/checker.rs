use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::linked_data::LinkedDataProcessor;
use crate::loader::DocumentLoader;
use crate::registry::Registry;
use crate::types::{DocumentFailure, EntryLinks, LinkReport};

/// Checks documents for references that cannot be dereferenced.
///
/// A checker only holds shared read-only collaborators, so clones can run on
/// separate workers.
#[derive(Clone)]
pub struct LinkChecker {
    registry: Arc<Registry>,
    loader: Arc<dyn DocumentLoader>,
    processor: Arc<dyn LinkedDataProcessor>,
}

impl LinkChecker {
    pub fn new(
        registry: Arc<Registry>,
        loader: Arc<dyn DocumentLoader>,
        processor: Arc<dyn LinkedDataProcessor>,
    ) -> Self {
        Self {
            registry,
            loader,
            processor,
        }
    }

    /// Checks every entry of the document at `location`.
    ///
    /// Each identified top-level node becomes one [`EntryLinks`]. Every
    /// identifier it references is fetched and expanded once; those that fail
    /// are reported as broken.
    pub fn check(&self, location: &str) -> Result<Vec<EntryLinks>> {
        let resolved = self.registry.resolve_location(location);
        let document = self.loader.load(&resolved)?;
        let expanded = self.processor.expand(&document, Some(&resolved))?;

        let mut reachable: HashMap<String, bool> = HashMap::new();
        let mut entries = Vec::new();

        for node in expanded.as_array().map(Vec::as_slice).unwrap_or_default() {
            let Some(map) = node.as_object() else { continue };
            let Some(id) = map.get("@id").and_then(Value::as_str) else {
                continue;
            };

            let mut all_links = BTreeSet::new();
            for (key, value) in map {
                if !key.starts_with('@') || key == "@graph" {
                    collect_references(value, &mut all_links);
                }
            }
            all_links.remove(id);

            let broken_links: Vec<String> = all_links
                .iter()
                .filter(|target| {
                    let ok = *reachable
                        .entry((*target).clone())
                        .or_insert_with(|| self.dereferences(target));
                    !ok
                })
                .cloned()
                .collect();

            debug!(
                id,
                links = all_links.len(),
                broken = broken_links.len(),
                "checked entry"
            );
            entries.push(EntryLinks {
                id: id.to_string(),
                all_links,
                broken_links,
            });
        }
        Ok(entries)
    }

    /// Checks all `locations` on a pool of at most `workers` blocking tasks.
    ///
    /// A document that cannot be checked at all is recorded as a failure;
    /// the remaining documents are still checked. Entries are reported in
    /// the order of `locations`.
    pub async fn check_all(&self, locations: &[String], workers: usize) -> LinkReport {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();

        for (index, location) in locations.iter().enumerate() {
            let checker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let location = location.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let task_location = location.clone();
                let outcome = tokio::task::spawn_blocking(move || checker.check(&task_location))
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|r| r.map_err(|e| e.to_string()));
                (index, location, outcome)
            });
        }

        let mut results = Vec::with_capacity(locations.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "link-check task aborted"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = LinkReport::default();
        for (_, location, outcome) in results {
            match outcome {
                Ok(entries) => report.entries.extend(entries),
                Err(message) => {
                    warn!(location = location.as_str(), error = message.as_str(), "failed to check document");
                    report.failures.push(DocumentFailure { location, message });
                }
            }
        }

        info!(
            documents = locations.len(),
            entries = report.entries.len(),
            broken = report.broken_count(),
            failures = report.failures.len(),
            "link check complete"
        );
        report
    }

    fn dereferences(&self, id: &str) -> bool {
        let location = self.registry.resolve_location(id);
        let outcome = self
            .loader
            .load(&location)
            .and_then(|doc| self.processor.expand(&doc, Some(&location)));
        match outcome {
            Ok(_) => true,
            Err(e) => {
                debug!(id, error = %e, "broken reference");
                false
            }
        }
    }
}

/// Collects the identifiers referenced anywhere inside a property value.
fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Object(map) => {
            if map.contains_key("@value") {
                return;
            }
            if let Some(id) = map.get("@id").and_then(Value::as_str) {
                if !id.starts_with("_:") {
                    out.insert(id.to_string());
                }
            }
            for (key, inner) in map {
                if !key.starts_with('@') || key == "@list" || key == "@graph" {
                    collect_references(inner, out);
                }
            }
        }
        _ => {}
    }
}
