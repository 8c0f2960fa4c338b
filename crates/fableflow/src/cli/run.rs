//! Pipeline command handlers.

use fableflow::Settings;
use fableflow_error::{FableFlowResult, PipelineError, PipelineErrorKind};
use fableflow_interface::{ChatDriver, ImageDriver};
use fableflow_models::{OpenAiClient, OpenAiImageClient};
use fableflow_pipeline::{BookProducerStage, Pipeline, PipelineContext};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Builds a pipeline context wired to the configured backends.
fn build_context(settings: &Settings, output_dir: &Path) -> FableFlowResult<PipelineContext> {
    let chat = OpenAiClient::new(
        &settings.chat.base_url,
        settings.chat.api_key(),
        &settings.chat.model,
        settings.chat.timeout(),
    )?;
    let image = OpenAiImageClient::new(
        &settings.image.base_url,
        settings.image.api_key(),
        &settings.image.model,
        settings.image.timeout(),
    )?;

    let chat: Arc<dyn ChatDriver> = Arc::new(chat);
    let image: Arc<dyn ImageDriver> = Arc::new(image);

    Ok(PipelineContext::new(output_dir, chat, image)
        .with_continuation(settings.continuation.clone())
        .with_prompts(settings.prompts.clone())
        .with_meta(settings.book.clone())
        .with_style(settings.style.clone()))
}

fn prepare_output_dir(stage: &str, output_dir: &Path) -> FableFlowResult<()> {
    fs::create_dir_all(output_dir).map_err(|e| {
        PipelineError::new(PipelineErrorKind::StageFailed {
            stage: stage.to_string(),
            message: format!(
                "failed to create output directory {}: {}",
                output_dir.display(),
                e
            ),
        })
    })?;
    Ok(())
}

/// Runs the full publishing pipeline on a draft story.
///
/// The draft is seeded into the output directory as `story.txt` once;
/// an existing seed is kept so completed stages are skipped on rerun.
pub async fn run_publish(
    settings: &Settings,
    story: &Path,
    output_dir: &Path,
) -> FableFlowResult<()> {
    prepare_output_dir("publish", output_dir)?;
    let ctx = build_context(settings, output_dir)?;

    let seed = output_dir.join("story.txt");
    if seed.exists() {
        info!(path = %seed.display(), "keeping existing story seed");
    } else {
        let draft = fs::read(story).map_err(|e| {
            PipelineError::new(PipelineErrorKind::StageFailed {
                stage: "publish".to_string(),
                message: format!("failed to read draft story {}: {}", story.display(), e),
            })
        })?;
        ctx.write_atomic("story.txt", &draft)?;
        info!(path = %seed.display(), "seeded draft story");
    }

    Pipeline::standard().run(&ctx).await?;
    info!(output_dir = %output_dir.display(), "publishing pipeline finished");
    Ok(())
}

/// Rebuilds the HTML, PDF, and EPUB from an existing illustration plan.
pub async fn run_render(settings: &Settings, output_dir: &Path) -> FableFlowResult<()> {
    prepare_output_dir("render", output_dir)?;
    let ctx = build_context(settings, output_dir)?;

    // Book files are regenerated even when they already exist.
    for name in ["book.html", "book.pdf", "book.epub"] {
        let path = output_dir.join(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                PipelineError::new(PipelineErrorKind::StageFailed {
                    stage: "render".to_string(),
                    message: format!("failed to remove stale {}: {}", path.display(), e),
                })
            })?;
        }
    }

    Pipeline::new().push(BookProducerStage).run(&ctx).await?;
    info!(output_dir = %output_dir.display(), "book files rebuilt");
    Ok(())
}
