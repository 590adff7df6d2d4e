use std::sync::Arc;

use serde_json::{json, Value};
use vocabgraph::linked_data::{JsonLdProcessor, LinkedDataProcessor};
use vocabgraph::loader::MemoryLoader;
use vocabgraph::registry::Registry;
use vocabgraph::resolution::ReferenceResolver;

const A: &str = "http://example.org/a";
const B: &str = "http://example.org/b";
const VOCAB: &str = "http://example.org/vocab/";

fn context() -> Value {
    json!({"@vocab": VOCAB})
}

fn registry() -> Registry {
    Registry::new([("ex", "http://example.org/")])
}

/// A references B and overrides B's `note` alongside the reference.
fn linked_corpus() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new()
            .with(
                A,
                json!({
                    "@context": context(),
                    "@id": A,
                    "@type": "Thing",
                    "name": "A",
                    "rel": {"@id": B, "note": "override"}
                }),
            )
            .with(
                B,
                json!({
                    "@context": context(),
                    "@id": B,
                    "@type": "Thing",
                    "name": "B",
                    "note": "original"
                }),
            ),
    )
}

fn prop(name: &str) -> String {
    format!("{}{}", VOCAB, name)
}

#[test]
fn test_document_without_references_resolves_to_its_expansion() {
    let document = json!({"@context": context(), "@id": A, "@type": "Thing", "name": "A"});
    let loader = Arc::new(MemoryLoader::new().with(A, document.clone()));
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let expected = processor.expand(&document, Some(A)).unwrap();
    for depth in [0, 1, 3] {
        assert_eq!(resolver.resolve(A, false, depth).unwrap(), expected);
    }
}

#[test]
fn test_depth_zero_fetches_once() {
    let loader = linked_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, true, 0).unwrap();
    assert_eq!(loader.fetch_count(), 1);
    assert_eq!(resolved["rel"]["@id"], B);
}

#[test]
fn test_reference_is_merged_with_overrides() {
    let loader = linked_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, false, 1).unwrap();
    let rel = &resolved[0][prop("rel")][0];
    assert_eq!(rel["@id"], B);
    assert_eq!(rel[prop("name")], json!([{"@value": "B"}]));
    assert_eq!(rel[prop("note")], json!([{"@value": "override"}]));
    assert_eq!(loader.fetch_count(), 2);
}

#[test]
fn test_compact_resolution_keeps_original_keys() {
    let loader = linked_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, true, 1).unwrap();
    let object = resolved.as_object().unwrap();
    for key in ["@context", "@id", "@type", "name", "rel"] {
        assert!(object.contains_key(key), "missing key {key}");
    }
    assert_eq!(resolved["name"], "A");
    assert_eq!(resolved["rel"]["name"], "B");
    assert_eq!(resolved["rel"]["note"], "override");
}

#[test]
fn test_missing_reference_becomes_null() {
    let loader = Arc::new(MemoryLoader::new().with(
        A,
        json!({
            "@context": context(),
            "@id": A,
            "@type": "Thing",
            "rel": {"@id": "http://example.org/nowhere"}
        }),
    ));
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, false, 2).unwrap();
    assert_eq!(resolved[0][prop("rel")], json!([null]));
}

#[test]
fn test_missing_root_is_an_error() {
    let loader = Arc::new(MemoryLoader::new());
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let err = resolver.resolve(A, false, 1).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_cyclic_references_terminate() {
    let loader = Arc::new(
        MemoryLoader::new()
            .with(A, json!({"@context": context(), "@id": A, "@type": "Thing", "rel": {"@id": B}}))
            .with(B, json!({"@context": context(), "@id": B, "@type": "Thing", "rel": {"@id": A}})),
    );
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, false, 10).unwrap();
    let b = &resolved[0][prop("rel")][0];
    assert_eq!(b["@id"], B);
    // The reference back to A is left as a plain reference.
    assert_eq!(b[prop("rel")], json!([{"@id": A}]));
    assert_eq!(loader.fetch_count(), 2);
}

#[test]
fn test_prefixed_identifiers_go_through_the_registry() {
    let loader = linked_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve("ex:a", false, 0).unwrap();
    assert_eq!(resolved[0]["@id"], A);
}

#[test]
fn test_depth_bounds_nesting() {
    let c = "http://example.org/c";
    let loader = Arc::new(
        MemoryLoader::new()
            .with(A, json!({"@context": context(), "@id": A, "@type": "Thing", "rel": {"@id": B}}))
            .with(B, json!({"@context": context(), "@id": B, "@type": "Thing", "rel": {"@id": c}}))
            .with(c, json!({"@context": context(), "@id": c, "@type": "Thing", "name": "C"})),
    );
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve(A, false, 1).unwrap();
    let b = &resolved[0][prop("rel")][0];
    assert_eq!(b[prop("rel")], json!([{"@id": c}]));
    assert_eq!(loader.fetch_count(), 2);
}

const CONTEXT: &str = "http://example.org/context.jsonld";

/// A links to B through a property coerced to identifiers, with the context
/// served remotely and referenced relatively.
fn coerced_corpus() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new()
            .with(
                CONTEXT,
                json!({"@context": {
                    "@vocab": VOCAB,
                    "ex": "http://example.org/",
                    "rel": {"@type": "@id"}
                }}),
            )
            .with(
                A,
                json!({
                    "@context": "context.jsonld",
                    "@id": "ex:a",
                    "@type": "Thing",
                    "name": "A",
                    "rel": "ex:b"
                }),
            )
            .with(
                B,
                json!({
                    "@context": "context.jsonld",
                    "@id": "ex:b",
                    "@type": "Thing",
                    "name": "B"
                }),
            ),
    )
}

#[test]
fn test_coerced_link_keeps_its_name_when_embedded() {
    let loader = coerced_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve("ex:a", true, 1).unwrap();
    let object = resolved.as_object().unwrap();
    for key in ["@context", "@id", "@type", "name", "rel"] {
        assert!(object.contains_key(key), "missing key {key}");
    }
    assert_eq!(resolved["@context"], CONTEXT);
    assert_eq!(resolved["rel"]["@id"], "ex:b");
    assert_eq!(resolved["rel"]["name"], "B");
}

#[test]
fn test_coerced_link_compacts_to_string_at_depth_zero() {
    let loader = coerced_corpus();
    let processor = JsonLdProcessor::new(loader.clone());
    let registry = registry();
    let resolver = ReferenceResolver::new(&registry, &*loader, &processor);

    let resolved = resolver.resolve("ex:a", true, 0).unwrap();
    assert_eq!(resolved["rel"], "ex:b");
    assert_eq!(resolved["name"], "A");
}
