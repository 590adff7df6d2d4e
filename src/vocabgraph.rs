use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{load_config, save_config, should_include_file, VocabGraphConfig};
use crate::context::ContextWalker;
use crate::errors::Result;
use crate::graph::{corpus_checksum, GraphBuilder};
use crate::linkcheck::LinkChecker;
use crate::linked_data::{document_context, JsonLdProcessor, LinkedDataProcessor};
use crate::loader::{load_all, DefaultLoader, DocumentLoader};
use crate::registry::Registry;
use crate::resolution::ReferenceResolver;
use crate::types::*;

/// Central orchestrator wiring configuration, registry, loader and
/// processor into the resolver, graph builder, context walker and link
/// checker.
pub struct VocabGraph {
    config: VocabGraphConfig,
    registry: Arc<Registry>,
    loader: Arc<dyn DocumentLoader>,
    processor: Arc<JsonLdProcessor>,
    project_root: PathBuf,
}

/// Outcome of [`VocabGraph::refresh_graph`].
pub struct RefreshResult {
    pub graph: Graph,
    /// `false` when the stored graph already matched the corpus.
    pub rebuilt: bool,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl VocabGraph {
    /// Initializes a project at the given root by writing a default
    /// configuration to `.vocabgraph/config.json`.
    pub fn init(project_root: &Path) -> Result<Self> {
        let config = VocabGraphConfig::default();
        save_config(project_root, &config)?;
        Ok(Self::with_config(project_root, config))
    }

    /// Opens the project at the given root. Without a stored configuration
    /// the defaults apply.
    pub fn open(project_root: &Path) -> Result<Self> {
        let config = load_config(project_root)?;
        Ok(Self::with_config(project_root, config))
    }

    /// Builds a project around the default network/filesystem loader.
    pub fn with_config(project_root: &Path, config: VocabGraphConfig) -> Self {
        let registry = Arc::new(Registry::from_config(&config));
        let loader: Arc<dyn DocumentLoader> = Arc::new(
            DefaultLoader::new(Arc::clone(&registry), &config).with_root(project_root),
        );
        Self::with_loader(project_root, config, loader)
    }

    /// Builds a project that fetches every document through `loader`.
    pub fn with_loader(
        project_root: &Path,
        config: VocabGraphConfig,
        loader: Arc<dyn DocumentLoader>,
    ) -> Self {
        let registry = Arc::new(Registry::from_config(&config));
        let processor = Arc::new(JsonLdProcessor::new(Arc::clone(&loader)));
        Self {
            config,
            registry,
            loader,
            processor,
            project_root: project_root.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

impl VocabGraph {
    /// Resolves a document, following references `depth` levels deep
    /// (the configured default when `None`).
    pub fn resolve(&self, id: &str, compact: bool, depth: Option<u32>) -> Result<Value> {
        let depth = depth.unwrap_or(self.config.default_depth);
        let resolver = ReferenceResolver::new(&self.registry, &*self.loader, &*self.processor);
        resolver.resolve(id, compact, depth)
    }

    /// Loads and expands a single document.
    pub fn expand(&self, location: &str) -> Result<Value> {
        let location = self.registry.resolve_location(location);
        let document = self.loader.load(&location)?;
        self.processor.expand(&document, Some(&location))
    }

    /// Loads and compacts a document, against `context` when given and
    /// against the document's own context otherwise.
    pub fn compact(&self, location: &str, context: Option<&str>) -> Result<Value> {
        let location = self.registry.resolve_location(location);
        let document = self.loader.load(&location)?;
        let expanded = self.processor.expand(&document, Some(&location))?;
        let context = match context {
            Some(reference) => Value::String(self.registry.resolve_location(reference)),
            None => document_context(&document, &location),
        };
        self.processor.compact(&expanded, &context)
    }

    /// Converts the document at `location` to triples.
    pub fn to_rdf(&self, location: &str) -> Result<Dataset> {
        let expanded = self.expand(location)?;
        self.processor.to_rdf(&expanded)
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

impl VocabGraph {
    /// Expands directory locations into the documents they contain.
    ///
    /// Other locations are passed through unchanged. Discovered files are
    /// filtered by the include/exclude patterns and the size limit, and are
    /// returned in path order.
    pub fn corpus_locations(&self, locations: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        for location in locations {
            let path = self.project_root.join(location);
            if path.is_dir() {
                out.extend(self.scan_documents(&path));
            } else {
                out.push(location.clone());
            }
        }
        out
    }

    /// Builds the graph of the corpus at `locations`.
    pub fn build_graph(&self, locations: &[String]) -> Result<Graph> {
        let locations = self.corpus_locations(locations);
        GraphBuilder::new(&*self.loader, &*self.processor).build(&locations)
    }

    /// Returns the graph stored at `output`, rebuilding and rewriting it
    /// when the corpus changed since it was written or `force` is set.
    pub fn refresh_graph(
        &self,
        locations: &[String],
        output: Option<&Path>,
        force: bool,
    ) -> Result<RefreshResult> {
        let start = Instant::now();
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.graph_path());

        let locations = self.corpus_locations(locations);
        let documents = load_all(&*self.loader, &locations)?;
        let checksum = corpus_checksum(&Value::Array(documents.clone()));

        if !force && path.is_file() {
            match Graph::read(&path) {
                Ok(stored) if stored.is_current(&checksum) => {
                    debug!(path = %path.display(), "stored graph is current");
                    return Ok(RefreshResult {
                        graph: stored,
                        rebuilt: false,
                        duration_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Ok(_) => debug!(path = %path.display(), "corpus changed; rebuilding graph"),
                Err(e) => debug!(path = %path.display(), error = %e, "unreadable graph; rebuilding"),
            }
        }

        let graph = GraphBuilder::new(&*self.loader, &*self.processor)
            .build_from_documents(documents)?;
        graph.write(&path)?;
        info!(path = %path.display(), documents = locations.len(), "graph written");

        Ok(RefreshResult {
            graph,
            rebuilt: true,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Where the graph is persisted by default.
    pub fn graph_path(&self) -> PathBuf {
        self.project_root.join(&self.config.graph_file)
    }

    /// Reads a persisted graph, from the default location when `path` is `None`.
    pub fn read_graph(&self, path: Option<&Path>) -> Result<Graph> {
        match path {
            Some(p) => Graph::read(&self.project_root.join(p)),
            None => Graph::read(&self.graph_path()),
        }
    }

    /// Synthesizes the context document for `type_id` from a built graph.
    /// Prefixed type names are expanded through the registry first.
    pub fn context_for_type(&self, graph: &Graph, type_id: &str) -> Result<Value> {
        let walker = ContextWalker::new(graph);
        if graph.types.contains_key(type_id) {
            return walker.context_for_type(type_id);
        }
        walker.context_for_type(&self.registry.resolve(type_id))
    }

    fn scan_documents(&self, dir: &Path) -> Vec<String> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            if !should_include_file(&relative.to_string_lossy(), &self.config) {
                continue;
            }
            match std::fs::metadata(path) {
                Ok(metadata) if metadata.len() <= self.config.max_file_size => {
                    files.push(path.to_string_lossy().to_string());
                }
                _ => debug!(path = %path.display(), "skipping oversized document"),
            }
        }
        files.sort();
        files
    }
}

// ---------------------------------------------------------------------------
// Link checking
// ---------------------------------------------------------------------------

impl VocabGraph {
    /// Checks every document of the corpus for broken references on a pool of
    /// `workers` (the configured size when `None`).
    pub async fn check_links(&self, locations: &[String], workers: Option<usize>) -> LinkReport {
        let locations = self.corpus_locations(locations);
        let processor: Arc<dyn LinkedDataProcessor> = self.processor.clone();
        let checker = LinkChecker::new(Arc::clone(&self.registry), Arc::clone(&self.loader), processor);
        checker
            .check_all(&locations, workers.unwrap_or(self.config.link_check_workers))
            .await
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl VocabGraph {
    pub fn config(&self) -> &VocabGraphConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn processor(&self) -> &dyn LinkedDataProcessor {
        &*self.processor
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}
