//! Stage orchestration for FableFlow book production.
//!
//! The pipeline is an explicit, resumable stage sequence: editorial
//! passes refine the story text through a chain of files, an
//! illustration planner inserts image markup, an illustrator renders
//! the planned images, and a producer assembles the final book. Every
//! stage writes its outputs atomically and is skipped outright when
//! they already exist, so an interrupted run picks up where it left
//! off.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod editorial;
mod illustration;
mod producer;
mod prompts;
mod stage;

pub use context::PipelineContext;
pub use editorial::{EditorialStage, FinalCopyStage};
pub use illustration::{IllustratorStage, PlannerStage};
pub use producer::BookProducerStage;
pub use prompts::StagePrompts;
pub use stage::{Pipeline, Stage};
