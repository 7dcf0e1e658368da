//! Asset ingestion and the conversion cache.
//!
//! [`ingest::Pipeline`] decides per file what work is needed, [`cache`]
//! owns the on-disk naming scheme, and [`jobs`] runs the conversion
//! work on detached threads.

mod cache;
mod ingest;
mod jobs;

pub use cache::{CachePaths, stem_of};
pub use ingest::Pipeline;
pub use jobs::{ConvertJob, CoverJob, FailurePolicy, JobKind};

#[cfg(test)]
mod tests;
