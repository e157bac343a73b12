//! Interpreting model replies as analyses

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::model::{AnalysisResult, PartialAnalysis};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern is valid")
});

/// Locate the JSON object in a model reply, tolerating Markdown fences and chatter
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(text) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a reply that must contain a complete analysis
pub fn parse_strict(text: &str) -> Result<AnalysisResult, String> {
    let json = extract_json_object(text).ok_or_else(|| "no JSON object in reply".to_string())?;
    let result: AnalysisResult =
        serde_json::from_str(json).map_err(|e| format!("invalid analysis JSON: {}", e))?;

    if result.summary.trim().is_empty() || result.analysis_body.trim().is_empty() {
        return Err("analysis JSON has empty summary or body".to_string());
    }
    Ok(result)
}

/// Parse whatever can be salvaged from a reply
///
/// Accepts camelCase or snake_case keys; a reply with no JSON at all is taken as the
/// analysis body.
pub fn parse_lenient(text: &str) -> PartialAnalysis {
    let value = extract_json_object(text).and_then(|json| serde_json::from_str::<Value>(json).ok());

    let Some(Value::Object(map)) = value else {
        let body = text.trim();
        return PartialAnalysis {
            analysis_body: (!body.is_empty()).then(|| body.to_string()),
            ..Default::default()
        };
    };

    let string_field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    let followup_questions = ["followupQuestions", "followup_questions", "questions"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

    PartialAnalysis {
        summary: string_field(&["summary"]),
        analysis_body: string_field(&["analysis", "analysisBody", "analysis_body"]),
        followup_questions,
    }
}

/// Cut a source down to `max_chars` characters
pub fn truncate_source(source: &str, max_chars: usize) -> Cow<'_, str> {
    match source.char_indices().nth(max_chars) {
        Some((byte_index, _)) => Cow::Owned(format!("{}\n\n[... truncated ...]", &source[..byte_index])),
        None => Cow::Borrowed(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"summary\": \"s\"}\n```\nHope it helps.";
        assert_eq!(extract_json_object(reply), Some("{\"summary\": \"s\"}"));
    }

    #[test]
    fn test_extract_from_bare_reply() {
        let reply = "Sure. {\"summary\": \"s\", \"analysis\": \"a\"} Done.";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"summary\": \"s\", \"analysis\": \"a\"}")
        );
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_strict_parse_requires_body() {
        let ok = parse_strict(
            r#"{"summary": "A land deed", "analysis": "It records...", "followupQuestions": ["Who witnessed it?"]}"#,
        )
        .unwrap();
        assert_eq!(ok.followup_questions, vec!["Who witnessed it?"]);

        assert!(parse_strict(r#"{"summary": "A land deed"}"#).is_err());
        assert!(parse_strict(r#"{"summary": "", "analysis": "x"}"#).is_err());
        assert!(parse_strict("plain prose").is_err());
    }

    #[test]
    fn test_lenient_parse_accepts_snake_case() {
        let partial = parse_lenient(
            r#"{"summary": "s", "analysis_body": "b", "followup_questions": ["q1", 7, "q2"]}"#,
        );
        assert_eq!(partial.summary.as_deref(), Some("s"));
        assert_eq!(partial.analysis_body.as_deref(), Some("b"));
        assert_eq!(
            partial.followup_questions,
            Some(vec!["q1".to_string(), "q2".to_string()])
        );
    }

    #[test]
    fn test_lenient_parse_uses_prose_as_body() {
        let partial = parse_lenient("The letter is a plea for clemency.");
        assert_eq!(
            partial.analysis_body.as_deref(),
            Some("The letter is a plea for clemency.")
        );
        assert!(partial.summary.is_none());
        assert_eq!(parse_lenient("   "), PartialAnalysis::default());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_source("short", 10), "short");

        let truncated = truncate_source("éééééé", 3);
        assert!(truncated.starts_with("ééé\n"));
        assert!(truncated.ends_with("[... truncated ...]"));
    }
}
