//! Assembles the final book artifacts from the planned story.

use async_trait::async_trait;
use fableflow_book::{DocumentParser, EpubRenderer, PdfRenderer, StoryFormatter};
use fableflow_error::FableFlowResult;
use tracing::info;

use crate::{PipelineContext, Stage};

/// Builds `book.html`, `book.pdf`, and `book.epub` from
/// `image_planner_story.txt`, the single source of truth for story
/// wording and image placement.
///
/// HTML assembly is fully deterministic: front matter comes from the
/// book metadata, chapters from the story formatter, so no model call
/// can alter approved wording at this point.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookProducerStage;

#[async_trait]
impl Stage for BookProducerStage {
    fn name(&self) -> &'static str {
        "book producer"
    }

    fn output_files(&self) -> Vec<String> {
        vec![
            "book.html".to_string(),
            "book.pdf".to_string(),
            "book.epub".to_string(),
        ]
    }

    async fn run(&self, ctx: &PipelineContext) -> FableFlowResult<()> {
        let story = ctx.read_required("image_planner_story.txt", "illustration planner")?;
        let meta = ctx.meta().normalized();
        let formatter = StoryFormatter::new();

        let mut html = String::new();
        html.push_str(&formatter.front_cover(&meta));
        html.push_str(&formatter.title_page(&meta));
        html.push_str(&formatter.publication_info(&meta, false));
        html.push_str(&formatter.format_story(&story));
        html.push_str(&formatter.back_cover(&meta));
        ctx.write_atomic("book.html", html.as_bytes())?;
        info!(chars = html.len(), "assembled book.html");

        let document = DocumentParser::new().parse(&html, meta)?;
        info!(sections = document.sections.len(), "parsed book structure");

        PdfRenderer::new(ctx.style().clone()).render(
            &document,
            ctx.output_dir(),
            &ctx.path("book.pdf"),
        )?;
        EpubRenderer::new().render(&document, ctx.output_dir(), &ctx.path("book.epub"))?;
        Ok(())
    }
}
