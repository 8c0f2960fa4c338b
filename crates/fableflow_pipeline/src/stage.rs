//! The stage abstraction and the orchestrator that walks it.

use async_trait::async_trait;
use fableflow_error::FableFlowResult;
use tracing::{info, instrument};

use crate::PipelineContext;

/// One unit of pipeline work with declared outputs.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Human-readable stage name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Artifacts this stage commits, relative to the working
    /// directory. A stage whose outputs all exist is skipped; an
    /// empty list means the stage always runs and manages its own
    /// per-file resumption.
    fn output_files(&self) -> Vec<String>;

    /// Executes the stage.
    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()>;
}

/// An ordered stage sequence with resume-on-exists semantics.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn push(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The full production sequence: editorial chain, illustration
    /// planning and rendering, then book assembly.
    pub fn standard() -> Self {
        Self::new()
            .push(crate::EditorialStage::critique())
            .push(crate::EditorialStage::moderation())
            .push(crate::EditorialStage::editor())
            .push(crate::EditorialStage::format_proof())
            .push(crate::FinalCopyStage)
            .push(crate::PlannerStage)
            .push(crate::IllustratorStage)
            .push(crate::BookProducerStage)
    }

    /// Runs every stage in order. Stages whose declared outputs all
    /// exist are skipped, so a failed run resumes at the first stage
    /// with work left to do.
    #[instrument(skip_all, fields(stages = self.stages.len()))]
    pub async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        for stage in &self.stages {
            let outputs = stage.output_files();
            if !outputs.is_empty() && outputs.iter().all(|f| ctx.path(f).exists()) {
                info!(stage = stage.name(), "outputs exist, skipping");
                continue;
            }
            info!(stage = stage.name(), "running");
            stage.run(ctx).await?;
        }
        Ok(())
    }
}
