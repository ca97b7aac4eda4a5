pub mod markdown;

use std::path::PathBuf;

use energy_client::domain::LatestSnapshot;
use time::OffsetDateTime;

use crate::{pipeline::PipelineError, publish::ConsumptionSummary};

pub use markdown::MarkdownDashboard;

/// Everything a renderer may show.
pub struct RenderInput<'a> {
    pub latest: Option<&'a LatestSnapshot>,
    pub summary: &'a ConsumptionSummary,
    pub generated_at: OffsetDateTime,
}

pub trait Renderer {
    /// Writes the rendered artifact and returns its path.
    fn render(&self, input: &RenderInput<'_>) -> Result<PathBuf, PipelineError>;
}
