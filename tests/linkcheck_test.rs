use std::sync::Arc;

use serde_json::{json, Value};
use vocabgraph::linkcheck::{format_report_as_markdown, LinkChecker};
use vocabgraph::linked_data::{JsonLdProcessor, LinkedDataProcessor};
use vocabgraph::loader::{DocumentLoader, MemoryLoader};
use vocabgraph::registry::Registry;

const A: &str = "http://example.org/a";
const B: &str = "http://example.org/b";
const MISSING: &str = "http://example.org/missing";

fn document(id: &str, refs: &[&str]) -> Value {
    let refs: Vec<Value> = refs.iter().map(|r| json!({"@id": r})).collect();
    json!({
        "@context": {"@vocab": "http://example.org/vocab/"},
        "@id": id,
        "@type": "Thing",
        "rel": refs
    })
}

/// Helper: checker over A (-> B, missing) and B (-> A).
fn setup() -> (LinkChecker, Arc<Registry>) {
    let loader: Arc<dyn DocumentLoader> = Arc::new(
        MemoryLoader::new()
            .with(A, document(A, &[B, MISSING]))
            .with(B, document(B, &[A])),
    );
    let processor: Arc<dyn LinkedDataProcessor> = Arc::new(JsonLdProcessor::new(Arc::clone(&loader)));
    let registry = Arc::new(Registry::new([("ex", "http://example.org/")]));
    (
        LinkChecker::new(Arc::clone(&registry), loader, processor),
        registry,
    )
}

#[test]
fn test_check_reports_broken_links() {
    let (checker, _) = setup();
    let entries = checker.check(A).unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.id, A);
    assert!(entry.all_links.contains(B));
    assert!(entry.all_links.contains(MISSING));
    assert_eq!(entry.broken_links, vec![MISSING.to_string()]);
}

#[test]
fn test_check_clean_document() {
    let (checker, _) = setup();
    let entries = checker.check("ex:b").unwrap();
    assert_eq!(entries[0].id, B);
    assert!(entries[0].broken_links.is_empty());
}

#[test]
fn test_check_missing_document_is_an_error() {
    let (checker, _) = setup();
    assert!(checker.check(MISSING).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_check_all_collects_entries_and_failures() {
    let (checker, _) = setup();
    let locations = vec![A.to_string(), MISSING.to_string(), B.to_string()];
    let report = checker.check_all(&locations, 2).await;

    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![A, B]);
    assert_eq!(report.broken_count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].location, MISSING);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_report_inverts_to_markdown() {
    let (checker, registry) = setup();
    let report = checker.check_all(&[A.to_string(), B.to_string()], 4).await;

    let reverse = report.broken_by_target();
    assert_eq!(reverse.get(MISSING), Some(&vec![A.to_string()]));

    let markdown = format_report_as_markdown(&report, &registry);
    assert!(markdown.contains("#### Broken: ex:missing\n - Referenced by: ex:a\n"));
    assert!(!markdown.contains("Failed Documents"));
}
