//! End-to-end pipeline runs against scripted mock backends.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fableflow_core::{ChatCompletion, ChatRequest, FinishReason};
use fableflow_error::FableFlowResult;
use fableflow_interface::{ChatDriver, ImageDriver};
use fableflow_pipeline::{Pipeline, PipelineContext};

const STORY: &str = "# The Sleepy Fox\n\n## Chapter 1: The Den\n\nHello fox.";
const PLANNED: &str = "Hello fox.\n\n<image>7 [a fox curled up in a mossy den]</image>";

/// Replays a scripted sequence of completions and records every
/// request it saw.
struct ScriptedChat {
    script: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedChat {
    fn new(mut responses: Vec<String>) -> Self {
        responses.reverse();
        Self {
            script: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatDriver for ScriptedChat {
    async fn generate(&self, _req: &ChatRequest) -> FableFlowResult<ChatCompletion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_else(|| STORY.to_string());
        Ok(ChatCompletion {
            content,
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

struct CountingImages {
    calls: AtomicUsize,
}

impl CountingImages {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDriver for CountingImages {
    async fn generate_image(
        &self,
        _prompt: &str,
        _width: u32,
        _height: u32,
    ) -> FableFlowResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Not a decodable image; renderers must tolerate that.
        Ok(b"not-a-real-png".to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

fn editorial_script() -> Vec<String> {
    // Four editorial passes then one chapter-planning call.
    vec![
        STORY.to_string(),
        STORY.to_string(),
        STORY.to_string(),
        STORY.to_string(),
        PLANNED.to_string(),
    ]
}

fn ctx(
    dir: &Path,
    chat: Arc<ScriptedChat>,
    images: Arc<CountingImages>,
) -> PipelineContext {
    PipelineContext::new(dir, chat, images)
}

#[tokio::test]
async fn full_run_produces_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.txt"), STORY).unwrap();
    let chat = Arc::new(ScriptedChat::new(editorial_script()));
    let images = Arc::new(CountingImages::new());
    let ctx = ctx(dir.path(), chat.clone(), images.clone());

    Pipeline::standard().run(&ctx).await.unwrap();

    for artifact in [
        "CR_story.txt",
        "CM_story.txt",
        "ED_story.txt",
        "final_proof_story.txt",
        "final_story.txt",
        "image_planner_story.txt",
        "front_cover.png",
        "back_cover.png",
        "image_0.png",
        "book.html",
        "book.pdf",
        "book.epub",
    ] {
        assert!(dir.path().join(artifact).exists(), "missing {artifact}");
    }
    assert_eq!(chat.call_count(), 5);
    // Two covers plus one planned interior image.
    assert_eq!(images.call_count(), 3);

    // The planner renumbers markup globally from 1.
    let planned = fs::read_to_string(dir.path().join("image_planner_story.txt")).unwrap();
    assert!(planned.contains("<image>1 [a fox curled up"));
    assert!(planned.starts_with("# The Sleepy Fox"));

    // Approved wording survives into the assembled book.
    let html = fs::read_to_string(dir.path().join("book.html")).unwrap();
    assert!(html.contains("Hello fox."));
    assert!(html.contains("image_0.png"));
}

#[tokio::test]
async fn second_run_skips_completed_stages() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.txt"), STORY).unwrap();
    let chat = Arc::new(ScriptedChat::new(editorial_script()));
    let images = Arc::new(CountingImages::new());
    let ctx = ctx(dir.path(), chat.clone(), images.clone());

    Pipeline::standard().run(&ctx).await.unwrap();
    let chat_calls = chat.call_count();
    let image_calls = images.call_count();

    Pipeline::standard().run(&ctx).await.unwrap();
    assert_eq!(chat.call_count(), chat_calls);
    assert_eq!(images.call_count(), image_calls);
}

#[tokio::test]
async fn resume_runs_only_remaining_stages() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.txt"), STORY).unwrap();
    // Pre-seed the editorial chain as a crashed run would leave it.
    for artifact in ["CR_story.txt", "CM_story.txt", "ED_story.txt"] {
        fs::write(dir.path().join(artifact), STORY).unwrap();
    }
    let chat = Arc::new(ScriptedChat::new(vec![
        STORY.to_string(),
        PLANNED.to_string(),
    ]));
    let images = Arc::new(CountingImages::new());
    let ctx = ctx(dir.path(), chat.clone(), images.clone());

    Pipeline::standard().run(&ctx).await.unwrap();
    // Format proof plus one planning call.
    assert_eq!(chat.call_count(), 2);
    assert!(dir.path().join("book.epub").exists());
}

#[tokio::test]
async fn missing_seed_story_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new(Vec::new()));
    let images = Arc::new(CountingImages::new());
    let ctx = ctx(dir.path(), chat, images);

    let err = Pipeline::standard().run(&ctx).await.unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("story.txt"));
    assert!(message.contains("story generation"));
}

#[tokio::test]
async fn no_tmp_files_survive_a_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.txt"), STORY).unwrap();
    let chat = Arc::new(ScriptedChat::new(editorial_script()));
    let images = Arc::new(CountingImages::new());
    let ctx = ctx(dir.path(), chat, images);

    Pipeline::standard().run(&ctx).await.unwrap();
    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "stray tmp files: {leftovers:?}");
}
