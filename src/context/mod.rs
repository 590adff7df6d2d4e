/// Walks a built graph to synthesize nested context templates.
pub mod walker;

pub use walker::{extend_leaf, ContextWalker};
