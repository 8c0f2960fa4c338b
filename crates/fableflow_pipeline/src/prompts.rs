//! System prompts for the LLM-backed stages.

use serde::{Deserialize, Serialize};

/// Per-stage system prompts, all overridable through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePrompts {
    /// Critical-review stage.
    pub critique: String,
    /// Content-moderation stage.
    pub moderation: String,
    /// Editorial revision stage.
    pub editor: String,
    /// Formatting-and-proof stage.
    pub format_proof: String,
    /// Illustration planning stage.
    pub image_planner: String,
}

impl Default for StagePrompts {
    fn default() -> Self {
        Self {
            critique: "You are an external reviewer of children's stories. Critique the \
                       story for narrative coherence, pacing, and age-appropriate language, \
                       then return a revised version of the full story that addresses your \
                       critique. Return only the revised story text."
                .to_string(),
            moderation: "You are a content moderator for children's books (ages 5-10). \
                         Review the story for unsuitable content and edit as needed. \
                         Return only the moderated story text."
                .to_string(),
            editor: "You are the editor of a children's book. Review the story and edit \
                     for clarity, consistency, and flow. Return only the edited story \
                     text."
                .to_string(),
            format_proof: "You are a proofreader. Correct spelling, punctuation, and \
                           chapter formatting without altering the story. Preserve the \
                           book title heading and '## Chapter N' markers exactly. Return \
                           only the corrected story text."
                .to_string(),
            image_planner: "You are an illustration planner for children's books. You \
                            insert image markup into story text without changing any of \
                            the story words. You only add image tags with detailed \
                            descriptions."
                .to_string(),
        }
    }
}
