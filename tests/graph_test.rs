use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use vocabgraph::graph::GraphBuilder;
use vocabgraph::linked_data::JsonLdProcessor;
use vocabgraph::loader::MemoryLoader;
use vocabgraph::types::*;

/// Helper: build a graph from in-memory documents.
fn build(documents: Vec<Value>) -> Graph {
    let loader = Arc::new(MemoryLoader::new());
    let processor = JsonLdProcessor::new(loader.clone());
    GraphBuilder::new(&*loader, &processor)
        .build_from_documents(documents)
        .expect("graph should build")
}

/// a references b, b references c; c is never defined.
fn chain_corpus() -> Vec<Value> {
    vec![
        json!({"@id": "ex:a/doc", "@type": "ex:Thing", "ex:rel": {"@id": "ex:b/doc"}}),
        json!({"@id": "ex:b/doc", "@type": "ex:Thing", "ex:rel": {"@id": "ex:c/doc"}}),
    ]
}

fn link<'a>(graph: &'a Graph, source: &str, target: &str) -> Option<&'a GraphLink> {
    graph
        .links
        .iter()
        .find(|l| l.source == source && l.target == target)
}

#[test]
fn test_chain_scenario() {
    let graph = build(chain_corpus());

    assert_eq!(graph.missing, vec!["ex:c/doc".to_string()]);

    let ab = link(&graph, "ex:a", "ex:b").expect("a -> b");
    assert_eq!(ab.predicate, "ex:rel");
    let bc = link(&graph, "ex:b", "ex:c").expect("b -> c");
    assert_eq!(bc.predicate, "ex:rel");
}

#[test]
fn test_typed_nodes_and_breadcrumbs() {
    let graph = build(chain_corpus());

    let a = graph.node("ex:a").expect("typed node");
    assert_eq!(a.node_type, "ex:Thing");
    assert_eq!(a.origin, "ex");

    let root = graph.node("ex").expect("breadcrumb root");
    assert_eq!(root.node_type, DIRECTORY);
    let leaf = graph.node("a").expect("breadcrumb leaf");
    assert_eq!(leaf.node_type, DIRECTORY_PATH);

    let down = link(&graph, "ex", "a").expect("ex -> a");
    assert!(down.is_hierarchy());
    let back = link(&graph, "a", "ex:a").expect("a -> ex:a");
    assert!(back.is_hierarchy());
}

#[test]
fn test_weights_count_emissions() {
    let graph = build(chain_corpus());

    // "ex" heads the breadcrumb of both sources.
    assert_eq!(graph.node("ex").unwrap().weight, 2);
    assert_eq!(graph.node("ex:a").unwrap().weight, 1);
    assert_eq!(link(&graph, "ex:a", "ex:b").unwrap().weight, 1);
}

#[test]
fn test_links_are_deduplicated() {
    let graph = build(vec![json!({
        "@id": "ex:a/doc",
        "@type": "ex:Thing",
        "ex:rel": [{"@id": "ex:b/one"}, {"@id": "ex:b/two"}]
    })]);

    let matching: Vec<&GraphLink> = graph
        .links
        .iter()
        .filter(|l| l.source == "ex:a" && l.target == "ex:b")
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].weight, 2);
}

#[test]
fn test_node_dedup_keeps_first_position_and_last_content() {
    let graph = build(vec![
        json!({"@id": "ex:a/one", "@type": "ex:First"}),
        json!({"@id": "ex:z/doc", "@type": "ex:Other"}),
        json!({"@id": "ex:a/two", "@type": "ex:Second"}),
    ]);

    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["ex:a", "ex:z"]);
    let a = graph.node("ex:a").unwrap();
    assert_eq!(a.node_type, "ex:Second");
    assert_eq!(a.weight, 2);
}

#[test]
fn test_https_nodes_are_excluded() {
    let graph = build(vec![json!({
        "@id": "https://example.org/x/doc",
        "@type": "https://example.org/Thing",
        "https://example.org/rel": {"@id": "https://example.org/y/doc"}
    })]);

    assert!(graph.nodes.iter().all(|n| n.origin != "https"));
    assert!(graph.nodes.is_empty());
    assert!(link(&graph, "https://example.org/x", "https://example.org/y").is_some());
    assert!(graph.types.contains_key("https://example.org/Thing"));
    assert!(graph.vocab.is_empty());
}

#[test]
fn test_types_and_vocab() {
    let graph = build(chain_corpus());

    // Both subjects declare ex:Thing; the last one seen represents it.
    assert_eq!(graph.types.get("ex:Thing").map(String::as_str), Some("ex:b"));
    assert_eq!(graph.vocab.get("ex:Thing").map(String::as_str), Some("Thing"));
}

#[test]
fn test_literal_and_blank_triples_are_skipped() {
    let graph = build(vec![json!({
        "@id": "ex:a/doc",
        "@type": "ex:Thing",
        "ex:label": "A literal",
        "ex:nested": {"ex:inner": {"@id": "ex:q/doc"}}
    })]);

    assert!(graph.links.iter().all(|l| l.predicate != "ex:label"));
    assert!(graph.links.iter().all(|l| l.predicate != "ex:nested"));
    assert!(graph.links.iter().all(|l| l.predicate != "ex:inner"));
}

#[test]
fn test_missing_references_are_reported() {
    let graph = build(vec![json!({
        "@id": "ex:x/doc",
        "@type": "ex:Thing",
        "ex:rel": {"@id": "ex:z/doc"}
    })]);
    assert!(graph.missing.contains(&"ex:z/doc".to_string()));
    assert!(!graph.missing.contains(&"ex:x/doc".to_string()));
}

#[test]
fn test_build_loads_locations() {
    let loader = Arc::new(
        MemoryLoader::new()
            .with("mem:first", chain_corpus()[0].clone())
            .with("mem:second", json!([chain_corpus()[1].clone()])),
    );
    let processor = JsonLdProcessor::new(loader.clone());
    let graph = GraphBuilder::new(&*loader, &processor)
        .build(&["mem:first".to_string(), "mem:second".to_string()])
        .unwrap();
    assert_eq!(graph, build(chain_corpus()));
}

#[test]
fn test_build_fails_on_missing_location() {
    let loader = Arc::new(MemoryLoader::new());
    let processor = JsonLdProcessor::new(loader.clone());
    let err = GraphBuilder::new(&*loader, &processor)
        .build(&["mem:none".to_string()])
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_checksum_tracks_corpus() {
    let first = build(chain_corpus());
    let again = build(chain_corpus());
    assert!(first.checksum.is_some());
    assert_eq!(first.checksum, again.checksum);

    let mut changed = chain_corpus();
    changed.push(json!({"@id": "ex:c/doc", "@type": "ex:Thing"}));
    assert_ne!(first.checksum, build(changed).checksum);
}

#[test]
fn test_write_and_read_graph() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("network.json");
    let graph = build(chain_corpus());

    graph.write(&path).unwrap();
    let loaded = Graph::read(&path).unwrap();
    assert_eq!(loaded, graph);

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["nodes", "links", "types", "vocab", "missing"] {
        assert!(raw.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(raw["nodes"][0]["type"], "ex:Thing");
}

#[test]
fn test_build_with_relative_remote_context() {
    let context = json!({"@context": {
        "@vocab": "http://example.org/vocab/",
        "rel": {"@type": "@id"}
    }});
    let loader = Arc::new(
        MemoryLoader::new()
            .with("http://example.org/data/_context_", context)
            .with(
                "http://example.org/data/a.json",
                json!({"@context": "_context_", "@id": "ex:a/doc", "@type": "Thing", "rel": "ex:b/doc"}),
            )
            .with(
                "http://example.org/data/b.json",
                json!([{"@context": "_context_", "@id": "ex:b/doc", "@type": "Thing", "rel": "ex:c/doc"}]),
            ),
    );
    let processor = JsonLdProcessor::new(loader.clone());
    let graph = GraphBuilder::new(&*loader, &processor)
        .build(&[
            "http://example.org/data/a.json".to_string(),
            "http://example.org/data/b.json".to_string(),
        ])
        .expect("relative contexts resolve against each document");

    assert_eq!(graph.missing, vec!["ex:c/doc".to_string()]);
    let ab = link(&graph, "ex:a", "ex:b").expect("a -> b");
    assert_eq!(ab.predicate, "http://example.org/vocab/rel");
    assert!(link(&graph, "ex:b", "ex:c").is_some());
    assert_eq!(
        graph.vocab.get("http://example.org/vocab/Thing").map(String::as_str),
        Some("Thing")
    );
}
