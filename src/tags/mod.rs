//! LLM-backed tag generation for case studies.
//!
//! When no LLM endpoint is configured, or the call fails for any reason,
//! tags fall back to the category plus the first two tools. A tagging
//! failure never fails the write that requested it.

use serde::Deserialize;
use serde_json::json;

use crate::config::LlmConfig;
use crate::db::Category;

const MAX_TAGS: usize = 5;

pub struct TagInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub tools: &'a [String],
    pub category: Category,
}

#[derive(Clone)]
pub struct TagGenerator {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagList {
    tags: Vec<String>,
}

impl TagGenerator {
    pub fn new(config: LlmConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Generate up to five short tags for a case study.
    pub async fn generate(&self, input: &TagInput<'_>) -> Vec<String> {
        let Some(api_url) = self.config.api_url.as_deref() else {
            return fallback_tags(input);
        };

        match self.call_llm(api_url, input).await {
            Ok(tags) if !tags.is_empty() => tags.into_iter().take(MAX_TAGS).collect(),
            Ok(_) => fallback_tags(input),
            Err(e) => {
                tracing::warn!("Tag generation failed, using fallback: {}", e);
                fallback_tags(input)
            }
        }
    }

    async fn call_llm(&self, api_url: &str, input: &TagInput<'_>) -> anyhow::Result<Vec<String>> {
        let prompt = format!(
            "Generate up to {} short lowercase tags for this case study.\n\
             Title: {}\nCategory: {}\nTools: {}\nDescription: {}",
            MAX_TAGS,
            input.title,
            input.category.as_str(),
            input.tools.join(", "),
            input.description,
        );

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You tag community case studies. Respond only with JSON."
                },
                { "role": "user", "content": prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "tag_list",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "tags": {
                                "type": "array",
                                "items": { "type": "string" }
                            }
                        },
                        "required": ["tags"],
                        "additionalProperties": false
                    }
                }
            }
        });

        let mut request = self.client.post(api_url).json(&body);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let parsed: TagList = serde_json::from_str(content)?;
        Ok(parsed
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect())
    }
}

/// Deterministic tags: the category plus the first two tools.
fn fallback_tags(input: &TagInput<'_>) -> Vec<String> {
    let mut tags = vec![input.category.as_str().to_string()];
    for tool in input.tools.iter().take(2) {
        let tool = tool.trim().to_lowercase();
        if !tool.is_empty() && !tags.contains(&tool) {
            tags.push(tool);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_tags() {
        let tools = vec![
            "ChatGPT".to_string(),
            "Zapier".to_string(),
            "Sheets".to_string(),
        ];
        let input = TagInput {
            title: "t",
            description: "d",
            tools: &tools,
            category: Category::Automation,
        };
        assert_eq!(fallback_tags(&input), vec!["automation", "chatgpt", "zapier"]);
    }

    #[test]
    fn test_fallback_tags_deduplicates_and_skips_blanks() {
        let tools = vec!["  ".to_string(), "Prompt".to_string()];
        let input = TagInput {
            title: "t",
            description: "d",
            tools: &tools,
            category: Category::Prompt,
        };
        assert_eq!(fallback_tags(&input), vec!["prompt"]);
    }

    #[tokio::test]
    async fn test_generate_without_endpoint_uses_fallback() {
        let generator = TagGenerator::new(LlmConfig::default(), reqwest::Client::new());
        let tools = vec!["Make".to_string()];
        let input = TagInput {
            title: "t",
            description: "d",
            tools: &tools,
            category: Category::Business,
        };
        assert_eq!(generator.generate(&input).await, vec!["business", "make"]);
    }
}
