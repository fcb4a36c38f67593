// SYNOID Shorts Script Model
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The script a short is built from. Scripts usually come out of a text
// model, so parsing tolerates prose and code fences around the JSON.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub text: String,
    #[serde(default)]
    pub visual_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    #[serde(default)]
    pub script_segments: Vec<ScriptSegment>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Script {
    /// Direct parse, then the first fenced block, then the outermost
    /// `{ .. }` span.
    pub fn parse_lenient(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Ok(script) = serde_json::from_str(trimmed) {
            return Ok(script);
        }

        let candidate = fenced_block(trimmed).unwrap_or(trimmed).trim();
        if let Ok(script) = serde_json::from_str(candidate) {
            return Ok(script);
        }

        match (candidate.find('{'), candidate.rfind('}')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&candidate[start..=end])
                .context("script JSON is malformed"),
            _ => bail!("no JSON object found in script text"),
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading script {:?}", path))?;
        Self::parse_lenient(&raw).with_context(|| format!("parsing script {:?}", path))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing script {:?}", path))
    }

    /// File-system safe form of the title.
    pub fn safe_title(&self) -> String {
        sanitize_filename(&self.title)
    }

    /// Folder name for this script's run; never empty.
    pub fn run_dir_name(&self) -> String {
        let safe = self.safe_title();
        if safe.is_empty() {
            "untitled".to_string()
        } else {
            safe
        }
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let mut parts = text.split("```");
    parts.next()?;
    let block = parts.next()?;
    Some(block.strip_prefix("json").unwrap_or(block))
}

/// Drops `\ / * ? : " < > |` and leading dots, turns spaces into
/// underscores and lower-cases the rest. The result never names `.`,
/// `..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    kept.trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r##"{
        "title": "The Dark Forest Theory",
        "script_segments": [
            {"text": "Why is the universe so quiet?", "visual_prompt": "night sky, 8k"},
            {"text": "Maybe everyone is hiding.", "visual_prompt": "dark forest"}
        ],
        "keywords": ["space", "#shorts"]
    }"##;

    #[test]
    fn test_parse_clean_json() {
        let script = Script::parse_lenient(SCRIPT).unwrap();
        assert_eq!(script.title, "The Dark Forest Theory");
        assert_eq!(script.script_segments.len(), 2);
        assert_eq!(script.keywords, vec!["space", "#shorts"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = format!("Here is your script:\n```json\n{}\n```\nEnjoy!", SCRIPT);
        let script = Script::parse_lenient(&raw).unwrap();
        assert_eq!(script.script_segments[1].visual_prompt, "dark forest");
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let raw = format!("Sure! {} Let me know if you want changes.", SCRIPT);
        assert!(Script::parse_lenient(&raw).is_ok());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let script =
            Script::parse_lenient(r#"{"title": "t", "script_segments": [{"text": "hi"}]}"#).unwrap();
        assert!(script.keywords.is_empty());
        assert_eq!(script.script_segments[0].visual_prompt, "");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Script::parse_lenient("the model refused").is_err());
        assert!(Script::parse_lenient("} backwards {").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("The Mandela Effect: False Memory?"),
            "the_mandela_effect_false_memory"
        );
        assert_eq!(sanitize_filename(r#"a/b\c*"d"<e>|f"#), "abcdef");
    }

    #[test]
    fn test_dot_titles_stay_inside_output_root() {
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("../../etc"), "etc");
        assert_eq!(sanitize_filename(".hidden plan"), "hidden_plan");
        assert_eq!(sanitize_filename("v1.2 notes"), "v1.2_notes");

        let script = Script {
            title: "..".to_string(),
            script_segments: Vec::new(),
            keywords: Vec::new(),
        };
        assert_eq!(script.run_dir_name(), "untitled");
        let run_dir = Path::new("output").join(script.run_dir_name());
        assert!(run_dir.starts_with("output"));
        assert_ne!(run_dir.file_name(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        let script = Script::parse_lenient(SCRIPT).unwrap();
        script.save(&path).await.unwrap();
        assert_eq!(Script::load(&path).await.unwrap(), script);
    }
}
