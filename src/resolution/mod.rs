/// Reference resolution module.
///
/// Materializes one linked document by dereferencing the `@id` references it
/// contains and merging the referenced documents in place.
mod resolver;

pub use resolver::ReferenceResolver;
