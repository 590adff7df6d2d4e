/// Conversion of a document corpus into a weighted dependency graph.
pub mod builder;

/// Persistence and change detection for built graphs.
pub mod store;

pub use builder::{local_name, origin_of, strip_last_segment, GraphBuilder};
pub use store::{content_hash, corpus_checksum};
