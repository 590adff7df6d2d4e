pub mod config;
pub mod context;
pub mod errors;
pub mod graph;
pub mod linkcheck;
pub mod linked_data;
pub mod loader;
pub mod registry;
pub mod resolution;
pub mod types;
pub mod vocabgraph;
