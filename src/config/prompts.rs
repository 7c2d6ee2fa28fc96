//! Prompt templates for url2tldr.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory
//! (`youtube.toml`, `reddit.toml`). Any field left out keeps its default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prompts {
    pub youtube: SourcePrompts,
    pub reddit: SourcePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Text blocks framing one kind of source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcePrompts {
    /// Instruction header placed at the top of the prompt.
    pub instructions: String,
    /// Heading above the metadata lines.
    pub metadata_heading: String,
    /// Heading above the body text.
    pub body_heading: String,
    /// Line emitted when some of the content could not be retrieved.
    /// `{{issues}}` expands to a `; `-separated list.
    pub partial_notice: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            youtube: SourcePrompts::youtube(),
            reddit: SourcePrompts::reddit(),
            variables: HashMap::new(),
        }
    }
}

/// Partial override of a [`SourcePrompts`], as read from a custom prompt file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SourcePromptOverrides {
    instructions: Option<String>,
    metadata_heading: Option<String>,
    body_heading: Option<String>,
    partial_notice: Option<String>,
}

impl SourcePromptOverrides {
    fn apply(self, prompts: &mut SourcePrompts) {
        if let Some(v) = self.instructions {
            prompts.instructions = v;
        }
        if let Some(v) = self.metadata_heading {
            prompts.metadata_heading = v;
        }
        if let Some(v) = self.body_heading {
            prompts.body_heading = v;
        }
        if let Some(v) = self.partial_notice {
            prompts.partial_notice = v;
        }
    }
}

impl SourcePrompts {
    fn youtube() -> Self {
        Self {
            instructions: r#"You are an assistant that summarizes YouTube videos.
Please read the following transcript and provide a concise summary:
- Only include the most relevant information and insights.
- Format your output as clear bullet points.
- Avoid unnecessary repetition or minor details."#
                .to_string(),
            metadata_heading: "Video information:".to_string(),
            body_heading: "Transcript:".to_string(),
            partial_notice: "Note: some details could not be retrieved ({{issues}}).".to_string(),
        }
    }

    fn reddit() -> Self {
        Self {
            instructions: r#"You are an assistant that summarizes Reddit discussions.
Please analyze the following thread and provide a concise summary:
- Only include the most relevant information and opinions.
- Format your output as clear bullet points.
- Avoid unnecessary repetition or minor details."#
                .to_string(),
            metadata_heading: "Thread information:".to_string(),
            body_heading: "Reddit comments:".to_string(),
            partial_notice: "Note: some details could not be retrieved ({{issues}}).".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let youtube_path = custom_path.join("youtube.toml");
            if youtube_path.exists() {
                let content = std::fs::read_to_string(&youtube_path)?;
                let overrides: SourcePromptOverrides = toml::from_str(&content)?;
                overrides.apply(&mut prompts.youtube);
            }

            let reddit_path = custom_path.join("reddit.toml");
            if reddit_path.exists() {
                let content = std::fs::read_to_string(&reddit_path)?;
                let overrides: SourcePromptOverrides = toml::from_str(&content)?;
                overrides.apply(&mut prompts.reddit);
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        // Sorted so overlapping substitutions always resolve the same way.
        let mut keys: Vec<_> = vars.keys().collect();
        keys.sort();

        let mut result = template.to_string();
        for key in keys {
            result = result.replace(&format!("{{{{{}}}}}", key), &vars[key]);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.youtube.instructions.contains("YouTube"));
        assert!(prompts.reddit.instructions.contains("Reddit"));
        assert_eq!(prompts.reddit.body_heading, "Reddit comments:");
    }

    #[test]
    fn test_render_template() {
        let template = "Summarize in {{language}}, max {{count}} bullets.";
        let mut vars = HashMap::new();
        vars.insert("language".to_string(), "French".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Summarize in French, max 5 bullets.");
    }

    #[test]
    fn test_custom_dir_overrides_one_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reddit.toml"),
            "instructions = \"Summarize this thread in {{language}}.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("language".to_string(), "German".to_string());
        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();

        assert_eq!(prompts.reddit.instructions, "Summarize this thread in {{language}}.");
        assert_eq!(prompts.reddit.body_heading, "Reddit comments:");
        assert_eq!(prompts.youtube, SourcePrompts::youtube());
        assert_eq!(
            prompts.render_with_custom(&prompts.reddit.instructions, &HashMap::new()),
            "Summarize this thread in German."
        );
    }
}
