use std::fs;
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::write_atomic;
use crate::errors::Result;
use crate::types::Graph;

/// Computes the SHA-256 hash of a string and returns it as a hex string.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash of a loaded corpus, taken over its canonical JSON serialization.
pub fn corpus_checksum(corpus: &Value) -> String {
    content_hash(&corpus.to_string())
}

impl Graph {
    /// Writes the graph as pretty-printed JSON, replacing any previous file.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, &json)?;
        debug!(path = %path.display(), nodes = self.nodes.len(), "wrote graph");
        Ok(())
    }

    /// Reads a graph previously written with [`Graph::write`].
    pub fn read(path: &Path) -> Result<Graph> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Returns `true` when the graph was built from a corpus with `checksum`.
    pub fn is_current(&self, checksum: &str) -> bool {
        self.checksum.as_deref() == Some(checksum)
    }
}
