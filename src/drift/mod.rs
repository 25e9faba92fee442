//! Drift detection: per-project pipeline, batched orchestration and results.

pub mod counts;
pub mod orchestrator;
pub mod pipeline;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{BatchPolicy, Orchestrator};
pub use pipeline::{DriftPipeline, PipelineStage};
pub use result::{ChangeCounts, DriftResult, DriftSummary, ResultAggregate};
