//! Configuration module for url2tldr.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SourcePrompts};
pub use settings::{
    CommentFilterSettings, GeneralSettings, PromptSettings, RedditSettings, RuntimeSettings,
    ServerSettings, Settings, YoutubeSettings,
};
