use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VocabGraphError};

/// Name of the configuration file stored inside the `.vocabgraph` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory used to store VocabGraph metadata.
pub const VOCABGRAPH_DIR: &str = ".vocabgraph";

/// A registered short-form prefix and the base identifier it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMapping {
    pub prefix: String,
    pub base: String,
}

impl PrefixMapping {
    pub fn new(prefix: &str, base: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            base: base.to_string(),
        }
    }
}

/// Configuration for a VocabGraph project.
///
/// Controls the prefix registry, resolution defaults, corpus discovery and
/// network behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabGraphConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Registered prefixes, in declaration order.
    pub prefixes: Vec<PrefixMapping>,
    /// Reference depth used when a caller does not give one.
    pub default_depth: u32,
    /// Whether resolved documents are compacted against their own context.
    pub compact_output: bool,
    /// File name (relative to the project root) of the persisted graph.
    pub graph_file: String,
    /// Glob patterns for documents to include when a location is a directory.
    pub include: Vec<String>,
    /// Glob patterns for documents to exclude when a location is a directory.
    pub exclude: Vec<String>,
    /// Maximum document size in bytes; larger files are skipped during discovery.
    pub max_file_size: u64,
    /// Attempts made for each network fetch before giving up.
    pub fetch_retries: u32,
    /// Global timeout applied to each network fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Number of documents checked concurrently by the link checker.
    pub link_check_workers: usize,
}

impl Default for VocabGraphConfig {
    fn default() -> Self {
        Self {
            version: 1,
            prefixes: vec![
                PrefixMapping::new("universal", "https://wcrp-cmip.github.io/WCRP-universe/"),
                PrefixMapping::new("vr", "https://wcrp-cmip.github.io/Variable-Registry/"),
                PrefixMapping::new("cmip6plus", "https://wcrp-cmip.github.io/CMIP6Plus_CVs/"),
                PrefixMapping::new("cmip7", "https://wcrp-cmip.github.io/CMIP7-CVs/"),
                PrefixMapping::new("cf", "https://wcrp-cmip.github.io/CF/"),
                PrefixMapping::new(
                    "obs4mips",
                    "https://wolfiex.github.io/obs4MIPs-cmor-tables-ld/",
                ),
            ],
            default_depth: 2,
            compact_output: true,
            graph_file: "network.json".to_string(),
            include: vec!["**/*.json".to_string(), "**/*.jsonld".to_string()],
            exclude: vec![
                ".git/**".to_string(),
                ".vocabgraph/**".to_string(),
                "node_modules/**".to_string(),
                "**/graph.jsonld".to_string(),
                "**/network.json".to_string(),
                "**/_context*".to_string(),
            ],
            max_file_size: 4_194_304,
            fetch_retries: 3,
            fetch_timeout_secs: 30,
            link_check_workers: 8,
        }
    }
}

/// Returns the path to the `.vocabgraph` directory within the given project root.
pub fn get_vocabgraph_dir(project_root: &Path) -> PathBuf {
    project_root.join(VOCABGRAPH_DIR)
}

/// Returns the path to the configuration file within the `.vocabgraph` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_vocabgraph_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns the default configuration.
pub fn load_config(project_root: &Path) -> Result<VocabGraphConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(VocabGraphConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| VocabGraphError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: VocabGraphConfig =
        serde_json::from_str(&contents).map_err(|e| VocabGraphError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location.
pub fn save_config(project_root: &Path, config: &VocabGraphConfig) -> Result<()> {
    let vocabgraph_dir = get_vocabgraph_dir(project_root);
    fs::create_dir_all(&vocabgraph_dir).map_err(|e| VocabGraphError::Config {
        message: format!(
            "failed to create vocabgraph directory '{}': {}",
            vocabgraph_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let json = serde_json::to_string_pretty(config).map_err(|e| VocabGraphError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    write_atomic(&config_path, &json).map_err(|e| VocabGraphError::Config {
        message: format!(
            "failed to write config file '{}': {}",
            config_path.display(),
            e
        ),
    })
}

/// Writes `contents` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Determines whether a discovered document should be loaded, based on the
/// configuration's include and exclude glob patterns.
///
/// Exclude patterns take precedence.
pub fn should_include_file(file_path: &str, config: &VocabGraphConfig) -> bool {
    let match_opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    for pattern_str in &config.exclude {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches_with(file_path, match_opts) {
                return false;
            }
        }
    }

    for pattern_str in &config.include {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches_with(file_path, match_opts) {
                return true;
            }
        }
    }

    false
}
