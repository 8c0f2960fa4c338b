//! Shared state handed to every stage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fableflow_book::{BookMeta, PdfStyle};
use fableflow_continuation::{ContinuationConfig, ContinuationService};
use fableflow_error::{FableFlowResult, PipelineError, PipelineErrorKind};
use fableflow_interface::{ChatDriver, ImageDriver};

/// Everything a stage needs: the working directory, the model
/// backends, and the shared configuration. Stages receive it by
/// reference instead of reaching for globals.
#[derive(Clone)]
pub struct PipelineContext {
    output_dir: PathBuf,
    chat: Arc<dyn ChatDriver>,
    image: Arc<dyn ImageDriver>,
    continuation: ContinuationConfig,
    prompts: crate::StagePrompts,
    meta: BookMeta,
    style: PdfStyle,
}

impl PipelineContext {
    /// Creates a context with default configuration.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        chat: Arc<dyn ChatDriver>,
        image: Arc<dyn ImageDriver>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            chat,
            image,
            continuation: ContinuationConfig::default(),
            prompts: crate::StagePrompts::default(),
            meta: BookMeta::default(),
            style: PdfStyle::default(),
        }
    }

    /// Replaces the continuation configuration.
    pub fn with_continuation(mut self, config: ContinuationConfig) -> Self {
        self.continuation = config;
        self
    }

    /// Replaces the stage prompts.
    pub fn with_prompts(mut self, prompts: crate::StagePrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replaces the book metadata.
    pub fn with_meta(mut self, meta: BookMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Replaces the page style.
    pub fn with_style(mut self, style: PdfStyle) -> Self {
        self.style = style;
        self
    }

    /// The working directory all artifacts live in.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The image backend.
    pub fn image_driver(&self) -> &Arc<dyn ImageDriver> {
        &self.image
    }

    /// The stage prompts.
    pub fn prompts(&self) -> &crate::StagePrompts {
        &self.prompts
    }

    /// The book metadata.
    pub fn meta(&self) -> &BookMeta {
        &self.meta
    }

    /// The page style.
    pub fn style(&self) -> &PdfStyle {
        &self.style
    }

    /// A continuation service over the configured chat backend.
    pub fn service(&self) -> ContinuationService<Arc<dyn ChatDriver>> {
        ContinuationService::new(self.chat.clone(), self.continuation.clone())
    }

    /// Absolute path of an artifact inside the working directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Reads an upstream artifact, failing with a pointer to the stage
    /// that produces it when the file is missing.
    pub fn read_required(&self, name: &str, produced_by: &str) -> FableFlowResult<String> {
        let path = self.path(name);
        if !path.exists() {
            return Err(PipelineError::new(PipelineErrorKind::MissingInput {
                path: path.display().to_string(),
                stage: produced_by.to_string(),
            })
            .into());
        }
        fs::read_to_string(&path).map_err(|e| {
            PipelineError::new(PipelineErrorKind::StageFailed {
                stage: produced_by.to_string(),
                message: format!("read {}: {e}", path.display()),
            })
            .into()
        })
    }

    /// Writes an artifact atomically: the bytes land in `<name>.tmp`
    /// first and are renamed into place, so readers never observe a
    /// half-written file and resume checks stay sound.
    pub fn write_atomic(&self, name: &str, bytes: &[u8]) -> FableFlowResult<()> {
        let path = self.path(name);
        let tmp = self.path(&format!("{name}.tmp"));
        let commit_err = |message: String| {
            PipelineError::new(PipelineErrorKind::CommitFailed {
                path: path.display().to_string(),
                message,
            })
        };
        fs::write(&tmp, bytes).map_err(|e| commit_err(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            commit_err(e.to_string())
        })?;
        Ok(())
    }
}
