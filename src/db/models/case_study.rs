//! Case study models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Case study category. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Prompt,
    Automation,
    Tools,
    Business,
    Activation,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Prompt => "prompt",
            Category::Automation => "automation",
            Category::Tools => "tools",
            Category::Business => "business",
            Category::Activation => "activation",
        }
    }
}

/// Row shape: tools, steps, and tags are JSON arrays stored in TEXT columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CaseStudy {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tools: String,
    pub challenge: String,
    pub solution: String,
    pub steps: String,
    pub impact: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_key: Option<String>,
    pub tags: String,
    pub is_recommended: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CaseStudy {
    /// Decode the JSON-in-TEXT columns and attach the viewer's favorite flag.
    pub fn to_response(self, is_favorite: bool) -> CaseStudyResponse {
        CaseStudyResponse {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            category: self.category,
            tools: parse_string_list(&self.tools),
            challenge: self.challenge,
            solution: self.solution,
            steps: parse_string_list(&self.steps),
            impact: self.impact,
            thumbnail_url: self.thumbnail_url,
            thumbnail_key: self.thumbnail_key,
            tags: parse_string_list(&self.tags),
            is_recommended: self.is_recommended != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_favorite,
        }
    }
}

/// Helper to parse a JSON string array from a TEXT column.
/// Malformed data degrades to an empty list rather than failing the request.
pub fn parse_string_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStudyResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tools: Vec<String>,
    pub challenge: String,
    pub solution: String,
    pub steps: Vec<String>,
    pub impact: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_key: Option<String>,
    pub tags: Vec<String>,
    pub is_recommended: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct CaseStudyPayload {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tools: Vec<String>,
    pub challenge: String,
    pub solution: String,
    pub steps: Vec<String>,
    pub impact: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_string_list(r#"["a","b"]"#),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(parse_string_list("").is_empty());
        assert!(parse_string_list("not json").is_empty());
    }

    #[test]
    fn test_to_response_decodes_json_columns() {
        let row = CaseStudy {
            id: "cs-1".to_string(),
            user_id: "u-1".to_string(),
            title: "Title".to_string(),
            description: "Desc".to_string(),
            category: Category::Automation,
            tools: r#"["ChatGPT","Zapier"]"#.to_string(),
            challenge: "c".to_string(),
            solution: "s".to_string(),
            steps: r#"["one"]"#.to_string(),
            impact: None,
            thumbnail_url: None,
            thumbnail_key: None,
            tags: "[]".to_string(),
            is_recommended: 1,
            created_at: 1,
            updated_at: 2,
        };

        let resp = row.to_response(true);
        assert_eq!(resp.tools, vec!["ChatGPT", "Zapier"]);
        assert_eq!(resp.steps, vec!["one"]);
        assert!(resp.tags.is_empty());
        assert!(resp.is_recommended);
        assert!(resp.is_favorite);
    }
}
