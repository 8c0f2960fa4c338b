//! The LLM editorial chain: each stage reads the previous stage's
//! text, asks the backend for a revision, and commits the result.

use async_trait::async_trait;
use fableflow_core::Message;
use fableflow_error::FableFlowResult;
use fableflow_continuation::Outcome;
use tracing::warn;

use crate::{PipelineContext, Stage};

/// Which editorial pass a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorialKind {
    Critique,
    Moderation,
    Editor,
    FormatProof,
}

/// One pass of the editorial chain.
#[derive(Debug, Clone, Copy)]
pub struct EditorialStage {
    kind: EditorialKind,
}

impl EditorialStage {
    /// Critical review: `story.txt` → `CR_story.txt`.
    pub fn critique() -> Self {
        Self {
            kind: EditorialKind::Critique,
        }
    }

    /// Content moderation: `CR_story.txt` → `CM_story.txt`.
    pub fn moderation() -> Self {
        Self {
            kind: EditorialKind::Moderation,
        }
    }

    /// Editorial revision: `CM_story.txt` → `ED_story.txt`.
    pub fn editor() -> Self {
        Self {
            kind: EditorialKind::Editor,
        }
    }

    /// Format and proof: `ED_story.txt` → `final_proof_story.txt`.
    pub fn format_proof() -> Self {
        Self {
            kind: EditorialKind::FormatProof,
        }
    }

    fn input(&self) -> (&'static str, &'static str) {
        match self.kind {
            EditorialKind::Critique => ("story.txt", "story generation"),
            EditorialKind::Moderation => ("CR_story.txt", "critique"),
            EditorialKind::Editor => ("CM_story.txt", "moderation"),
            EditorialKind::FormatProof => ("ED_story.txt", "editor"),
        }
    }

    fn output(&self) -> &'static str {
        match self.kind {
            EditorialKind::Critique => "CR_story.txt",
            EditorialKind::Moderation => "CM_story.txt",
            EditorialKind::Editor => "ED_story.txt",
            EditorialKind::FormatProof => "final_proof_story.txt",
        }
    }

    fn system_prompt<'a>(&self, ctx: &'a PipelineContext) -> &'a str {
        let prompts = ctx.prompts();
        match self.kind {
            EditorialKind::Critique => &prompts.critique,
            EditorialKind::Moderation => &prompts.moderation,
            EditorialKind::Editor => &prompts.editor,
            EditorialKind::FormatProof => &prompts.format_proof,
        }
    }

    fn user_prompt(&self, story: &str) -> String {
        match self.kind {
            EditorialKind::FormatProof => format!("Draft copy:\n{story}"),
            _ => format!("Story:\n\n{story}\n\nReturn the improved version of the story."),
        }
    }
}

#[async_trait]
impl Stage for EditorialStage {
    fn name(&self) -> &'static str {
        match self.kind {
            EditorialKind::Critique => "critique",
            EditorialKind::Moderation => "moderation",
            EditorialKind::Editor => "editor",
            EditorialKind::FormatProof => "format proof",
        }
    }

    fn output_files(&self) -> Vec<String> {
        vec![self.output().to_string()]
    }

    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        let (input, produced_by) = self.input();
        let story = ctx.read_required(input, produced_by)?;
        let messages = vec![
            Message::system(self.system_prompt(ctx)),
            Message::user(self.user_prompt(&story)),
        ];
        let result = ctx.service().generate(&messages, None).await?;
        if *result.metadata().outcome() != Outcome::Complete {
            warn!(
                stage = self.name(),
                outcome = %result.metadata().outcome(),
                "committing degraded editorial output"
            );
        }
        ctx.write_atomic(self.output(), result.text().as_bytes())
    }
}

/// Commits the approved manuscript: copies `final_proof_story.txt` to
/// `final_story.txt` verbatim. Downstream stages treat this file as
/// the single source of truth for story wording.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalCopyStage;

#[async_trait]
impl Stage for FinalCopyStage {
    fn name(&self) -> &'static str {
        "final copy"
    }

    fn output_files(&self) -> Vec<String> {
        vec!["final_story.txt".to_string()]
    }

    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        let story = ctx.read_required("final_proof_story.txt", "format proof")?;
        ctx.write_atomic("final_story.txt", story.as_bytes())
    }
}
