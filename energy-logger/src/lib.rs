pub mod config;
pub mod observability;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, FailurePolicy, Pipeline, PipelineError};
pub use publish::SnapshotPublisher;
