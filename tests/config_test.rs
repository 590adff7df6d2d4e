use vocabgraph::config::*;
use tempfile::TempDir;

#[test]
fn test_default_config_has_document_patterns() {
    let config = VocabGraphConfig::default();
    assert!(config.include.iter().any(|p| p == "**/*.json"));
    assert!(config.include.iter().any(|p| p == "**/*.jsonld"));
    assert!(config.exclude.iter().any(|p| p == ".git/**"));
    assert_eq!(config.default_depth, 2);
    assert!(config.compact_output);
}

#[test]
fn test_default_prefixes() {
    let config = VocabGraphConfig::default();
    let names: Vec<&str> = config.prefixes.iter().map(|p| p.prefix.as_str()).collect();
    assert!(names.contains(&"universal"));
    assert!(names.contains(&"cmip7"));
    assert!(config.prefixes.iter().all(|p| p.base.ends_with('/')));
}

#[test]
fn test_load_config_without_file_returns_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, VocabGraphConfig::default());
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let mut config = VocabGraphConfig::default();
    config.default_depth = 5;
    config.prefixes.push(PrefixMapping::new("ex", "https://example.org/"));
    save_config(dir.path(), &config).unwrap();

    assert!(get_config_path(dir.path()).is_file());
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(get_vocabgraph_dir(dir.path())).unwrap();
    std::fs::write(get_config_path(dir.path()), "{ not json").unwrap();

    let err = load_config(dir.path()).unwrap_err();
    assert!(err.to_string().contains("config error"));
}

#[test]
fn test_should_include_file() {
    let config = VocabGraphConfig::default();
    assert!(should_include_file("experiment/historical.json", &config));
    assert!(should_include_file("graph/source.jsonld", &config));
    assert!(!should_include_file("experiment/graph.jsonld", &config));
    assert!(!should_include_file("experiment/_context_", &config));
    assert!(!should_include_file(".git/HEAD.json", &config));
    assert!(!should_include_file("README.md", &config));
}

#[test]
fn test_vocabgraph_dir() {
    let dir = TempDir::new().unwrap();
    let vg_dir = get_vocabgraph_dir(dir.path());
    assert!(vg_dir.ends_with(".vocabgraph"));
}
