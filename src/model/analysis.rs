use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Placeholder summary used when an analysis reply omits one
pub const DEFAULT_SUMMARY: &str = "Analysis complete.";

/// Placeholder body used when an analysis reply omits one
pub const DEFAULT_ANALYSIS_BODY: &str = "See the detailed results.";

/// Generic follow-up questions used when an analysis reply omits them
pub const DEFAULT_FOLLOWUP_QUESTIONS: [&str; 3] = [
    "What was the broader historical context in which this source was produced?",
    "How might the author's position have shaped what the source includes or leaves out?",
    "Which other primary sources could corroborate or challenge this account?",
];

/// Descriptive metadata attached to a primary source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl DocumentMetadata {
    /// Render metadata as a bullet list for prompt inclusion
    pub fn to_prompt_block(&self) -> String {
        let fields = [
            ("Title", self.title.as_deref()),
            ("Author", self.author.as_deref()),
            ("Date", self.date.as_deref()),
            ("Place", self.place.as_deref()),
            ("Genre", self.genre.as_deref()),
        ];

        let mut block = String::new();
        for (label, value) in fields {
            let value = value.map(str::trim).filter(|v| !v.is_empty());
            block.push_str(&format!("- {}: {}\n", label, value.unwrap_or("Unknown")));
        }
        if !self.tags.is_empty() {
            block.push_str(&format!("- Tags: {}\n", self.tags.join(", ")));
        }
        block
    }
}

/// Request body shared by the analysis and counter-narrative endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// Full text of the primary source
    pub source: String,
    pub metadata: DocumentMetadata,
    /// Interpretive lens or persona to bias the analysis
    #[serde(default)]
    pub perspective: String,
    /// Model identifier or provider flag (e.g. "gpt-4o-mini", "claude")
    #[serde(default)]
    pub model: String,
}

impl AnalysisRequest {
    /// Reject requests without usable source text
    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("source text must not be empty".to_string());
        }
        Ok(())
    }
}

/// A complete, renderable analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(rename = "analysis")]
    pub analysis_body: String,
    #[serde(default)]
    pub followup_questions: Vec<String>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            summary: DEFAULT_SUMMARY.to_string(),
            analysis_body: DEFAULT_ANALYSIS_BODY.to_string(),
            followup_questions: DEFAULT_FOLLOWUP_QUESTIONS
                .iter()
                .map(|q| q.to_string())
                .collect(),
        }
    }
}

/// Lenient analysis shape returned by the fallback endpoint; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, rename = "analysis", skip_serializing_if = "Option::is_none")]
    pub analysis_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_questions: Option<Vec<String>>,
}

impl PartialAnalysis {
    /// Fill missing or blank fields with the fixed defaults
    pub fn into_result_with_defaults(self) -> AnalysisResult {
        let defaults = AnalysisResult::default();

        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        AnalysisResult {
            summary: non_blank(self.summary).unwrap_or(defaults.summary),
            analysis_body: non_blank(self.analysis_body).unwrap_or(defaults.analysis_body),
            followup_questions: self
                .followup_questions
                .filter(|qs| !qs.is_empty())
                .unwrap_or(defaults.followup_questions),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some() && self.analysis_body.is_some() && self.followup_questions.is_some()
    }
}

impl From<AnalysisResult> for PartialAnalysis {
    fn from(result: AnalysisResult) -> Self {
        Self {
            summary: Some(result.summary),
            analysis_body: Some(result.analysis_body),
            followup_questions: Some(result.followup_questions),
        }
    }
}

/// Success response of `/api/initial-analysis`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisExchange {
    pub analysis: AnalysisResult,
    pub raw_prompt: String,
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// Success response of `/api/analysis`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialAnalysisExchange {
    /// Missing entirely when the model reply could not be interpreted
    #[serde(default)]
    pub analysis: Option<PartialAnalysis>,
    #[serde(default)]
    pub raw_prompt: String,
    #[serde(default)]
    pub raw_response: String,
}

impl PartialAnalysisExchange {
    pub fn into_exchange(self) -> AnalysisExchange {
        AnalysisExchange {
            analysis: self.analysis.unwrap_or_default().into_result_with_defaults(),
            raw_prompt: self.raw_prompt,
            raw_response: self.raw_response,
            content_length: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_partial_gets_all_defaults() {
        let result = PartialAnalysis::default().into_result_with_defaults();

        assert_eq!(result.summary, "Analysis complete.");
        assert_eq!(result.analysis_body, "See the detailed results.");
        assert_eq!(result.followup_questions.len(), 3);
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn test_partial_keeps_present_fields() {
        let partial = PartialAnalysis {
            summary: Some("A petition to the crown".to_string()),
            analysis_body: Some("   ".to_string()),
            followup_questions: Some(vec![]),
        };

        let result = partial.into_result_with_defaults();

        assert_eq!(result.summary, "A petition to the crown");
        assert_eq!(result.analysis_body, DEFAULT_ANALYSIS_BODY);
        assert_eq!(result.followup_questions.len(), 3);
    }

    #[test]
    fn test_fallback_body_with_empty_analysis_object() {
        let body = r#"{"analysis": {}, "rawPrompt": "p", "rawResponse": "r"}"#;
        let exchange: PartialAnalysisExchange = serde_json::from_str(body).unwrap();

        let exchange = exchange.into_exchange();

        assert_eq!(exchange.analysis, AnalysisResult::default());
        assert_eq!(exchange.raw_prompt, "p");
    }

    #[test]
    fn test_fallback_body_without_analysis_key() {
        let exchange: PartialAnalysisExchange = serde_json::from_str("{}").unwrap();
        assert_eq!(exchange.into_exchange().analysis, AnalysisResult::default());
    }

    #[test]
    fn test_analysis_body_uses_analysis_key_on_the_wire() {
        let json = serde_json::to_value(AnalysisResult::default()).unwrap();
        assert_eq!(json["analysis"], DEFAULT_ANALYSIS_BODY);
        assert!(json.get("followupQuestions").is_some());
    }

    #[test]
    fn test_metadata_prompt_block_marks_unknown_fields() {
        let metadata = DocumentMetadata {
            title: Some("Letter to the Governor".to_string()),
            date: Some("1781".to_string()),
            tags: vec!["colonial".to_string(), "petition".to_string()],
            ..Default::default()
        };

        let block = metadata.to_prompt_block();

        assert!(block.contains("- Title: Letter to the Governor"));
        assert!(block.contains("- Author: Unknown"));
        assert!(block.contains("- Tags: colonial, petition"));
    }

    #[test]
    fn test_validate_rejects_blank_source() {
        let request = AnalysisRequest {
            source: " \n ".to_string(),
            metadata: DocumentMetadata::default(),
            perspective: String::new(),
            model: "gpt".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
