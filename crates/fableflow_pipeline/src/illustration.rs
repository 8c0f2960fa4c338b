//! Illustration planning and rendering stages.

use std::sync::LazyLock;

use async_trait::async_trait;
use fableflow_book::detect_chapters;
use fableflow_core::Message;
use fableflow_error::{FableFlowResult, PipelineError, PipelineErrorKind};
use fableflow_interface::ImageDriver;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{PipelineContext, Stage};

static IMAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<image>\s*\d+\s*\[")
        .unwrap_or_else(|_| unreachable!("image number pattern is valid"))
});

static IMAGE_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<image>\s*\d*\s*\[([^\]]+)\]\s*</image>")
        .unwrap_or_else(|_| unreachable!("image prompt pattern is valid"))
});

/// Target cover height in pixels; width follows the page aspect ratio.
const COVER_HEIGHT_PX: u32 = 1536;

/// Default pixel size for interior illustrations.
const ILLUSTRATION_SIZE_PX: (u32, u32) = (1024, 768);

/// Inserts `<image>N [description]</image>` markup into the approved
/// story, chapter by chapter, and commits the merged result to
/// `image_planner_story.txt`.
///
/// The story wording is never sent through in bulk: each chapter gets
/// its own planning call with strict do-not-edit instructions, and the
/// chapters are reassembled around the original title header. Image
/// numbers are renumbered globally afterwards so downstream indexing
/// stays 1-based and gap-free regardless of what the model returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerStage;

impl PlannerStage {
    fn chapter_prompt(title: &str, content: &str, number: usize, total: usize) -> String {
        format!(
            "You are planning illustrations for Chapter {number} of {total} in a \
             children's book.\n\n\
             Rules:\n\
             1. Do not change any words of the chapter text; preserve it exactly.\n\
             2. Only insert <image>NUMBER [detailed description]</image> tags, each on \
             its own line, at natural breaks.\n\
             3. Place 1-3 images in this chapter.\n\n\
             CHAPTER TITLE: {title}\n\n\
             CHAPTER TEXT:\n---\n{content}\n---\n\n\
             Return the chapter text with the image tags inserted."
        )
    }

    /// Rebuilds the full story: original pre-chapter header lines
    /// (book title, subtitle, rules) followed by `## title` markers and
    /// the planned chapter bodies.
    fn reconstruct(original: &str, chapters: &[(String, String)]) -> String {
        let mut parts: Vec<String> = Vec::new();
        for line in original.lines() {
            let trimmed = line.trim();
            let lowered = trimmed.to_lowercase();
            if lowered.starts_with("## chapter") || lowered.starts_with("chapter") {
                break;
            }
            if trimmed.starts_with('#') && !lowered.contains("chapter") {
                parts.push(line.to_string());
            } else if trimmed == "---" {
                parts.push(line.to_string());
            } else if trimmed.is_empty() && !parts.is_empty() {
                parts.push(String::new());
            }
        }
        if !parts.is_empty() {
            parts.push(String::new());
        }
        for (title, content) in chapters {
            parts.push(format!("## {title}"));
            parts.push(String::new());
            parts.push(content.trim().to_string());
            parts.push(String::new());
            parts.push(String::new());
        }
        parts.join("\n")
    }

    /// Renumbers image markup sequentially from 1 across the whole
    /// story, regardless of the per-chapter numbers the model chose.
    fn renumber(text: &str) -> String {
        let mut next = 0usize;
        IMAGE_NUMBER
            .replace_all(text, |_: &regex::Captures<'_>| {
                next += 1;
                format!("<image>{next} [")
            })
            .into_owned()
    }
}

#[async_trait]
impl Stage for PlannerStage {
    fn name(&self) -> &'static str {
        "illustration planner"
    }

    fn output_files(&self) -> Vec<String> {
        vec!["image_planner_story.txt".to_string()]
    }

    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        let story = ctx.read_required("final_story.txt", "final copy")?;
        let chapters = detect_chapters(&story);
        if chapters.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::StageFailed {
                stage: self.name().to_string(),
                message: "no chapters detected in final story".to_string(),
            })
            .into());
        }
        info!(chapters = chapters.len(), "planning illustrations");

        let service = ctx.service();
        let total = chapters.len();
        let mut planned: Vec<(String, String)> = Vec::with_capacity(total);
        for (i, chapter) in chapters.iter().enumerate() {
            info!(chapter = %chapter.title, "planning chapter images");
            let messages = vec![
                Message::system(&ctx.prompts().image_planner),
                Message::user(Self::chapter_prompt(
                    &chapter.title,
                    &chapter.body,
                    i + 1,
                    total,
                )),
            ];
            let result = service.generate(&messages, None).await?;
            planned.push((chapter.title.clone(), result.into_text().trim().to_string()));
        }

        let merged = Self::renumber(&Self::reconstruct(&story, &planned));
        ctx.write_atomic("image_planner_story.txt", merged.as_bytes())
    }
}

/// Renders the planned images through the [`ImageDriver`] seam:
/// `image_0.png` onward for interior markup, plus the two cover
/// images. Every file is skipped individually when it already exists,
/// and a failed generation logs and moves on rather than aborting the
/// book.
#[derive(Debug, Clone, Copy, Default)]
pub struct IllustratorStage;

impl IllustratorStage {
    fn cover_size(ctx: &PipelineContext) -> (u32, u32) {
        let style = ctx.style();
        let aspect = style.page_width / style.page_height;
        (
            (COVER_HEIGHT_PX as f32 * aspect) as u32,
            COVER_HEIGHT_PX,
        )
    }

    async fn generate_file(
        ctx: &PipelineContext,
        filename: &str,
        prompt: &str,
        width: u32,
        height: u32,
    ) {
        if ctx.path(filename).exists() {
            info!(filename, "already exists, skipping");
            return;
        }
        match ctx.image_driver().generate_image(prompt, width, height).await {
            Ok(bytes) => match ctx.write_atomic(filename, &bytes) {
                Ok(()) => info!(filename, "generated"),
                Err(err) => error!(%err, filename, "failed to commit image"),
            },
            Err(err) => error!(%err, filename, "failed to generate image"),
        }
    }
}

#[async_trait]
impl Stage for IllustratorStage {
    fn name(&self) -> &'static str {
        "illustrator"
    }

    // Resumption is per file; the stage itself always runs.
    fn output_files(&self) -> Vec<String> {
        Vec::new()
    }

    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        let story = ctx.read_required("image_planner_story.txt", "illustration planner")?;

        let (cover_w, cover_h) = Self::cover_size(ctx);
        let title_hint: String = ctx.meta().title.clone();
        let front_prompt = format!(
            "Children's book cover art with background suitable for title overlay: \
             watercolor style, soft pastels, scene inspired by \"{title_hint}\". \
             No text, letters, or writing of any kind."
        );
        let back_prompt = "Children's book back cover: simple watercolor pattern, very \
                           soft colors, subtle abstract design, clear space for text \
                           overlay, no text.";
        Self::generate_file(ctx, "front_cover.png", &front_prompt, cover_w, cover_h).await;
        Self::generate_file(ctx, "back_cover.png", back_prompt, cover_w, cover_h).await;

        let prompts: Vec<String> = IMAGE_PROMPT
            .captures_iter(&story)
            .map(|caps| caps[1].trim().to_string())
            .collect();
        if prompts.is_empty() {
            warn!("no image markup found in planned story");
            return Ok(());
        }
        info!(images = prompts.len(), "rendering planned images");
        let (img_w, img_h) = ILLUSTRATION_SIZE_PX;
        for (i, prompt) in prompts.iter().enumerate() {
            let filename = format!("image_{i}.png");
            let full_prompt =
                format!("A children's book illustration, watercolor style. Scene: {prompt}");
            Self::generate_file(ctx, &filename, &full_prompt, img_w, img_h).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbering_is_global_and_gap_free() {
        let text = "<image>1 [a]</image>\nx\n<image>4 [b]</image>\n<image>4 [c]</image>";
        let renumbered = PlannerStage::renumber(text);
        assert!(renumbered.contains("<image>1 [a]"));
        assert!(renumbered.contains("<image>2 [b]"));
        assert!(renumbered.contains("<image>3 [c]"));
    }

    #[test]
    fn reconstruct_preserves_title_header() {
        let original = "# The Sleepy Fox\n\n## Chapter 1: Den\nold text";
        let chapters = vec![(
            "Chapter 1: Den".to_string(),
            "new text\n<image>1 [fox]</image>".to_string(),
        )];
        let rebuilt = PlannerStage::reconstruct(original, &chapters);
        assert!(rebuilt.starts_with("# The Sleepy Fox"));
        assert!(rebuilt.contains("## Chapter 1: Den"));
        assert!(rebuilt.contains("new text"));
        assert!(!rebuilt.contains("old text"));
    }

    #[test]
    fn prompt_extraction_reads_bracket_contents() {
        let story = "a\n<image>1 [a fox by the river]</image>\nb";
        let prompts: Vec<String> = IMAGE_PROMPT
            .captures_iter(story)
            .map(|c| c[1].trim().to_string())
            .collect();
        assert_eq!(prompts, vec!["a fox by the river"]);
    }
}
