//! Prompts for primary-source analysis

use crate::model::AnalysisRequest;

/// System prompt for the full initial analysis
pub const INITIAL_ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a historian who specializes in the close reading of primary sources. Your task is to help a researcher understand a single document: what it says, who produced it, for whom, and what it reveals or conceals about its time.

## Rules

1. Ground every statement in the text or in its stated metadata. Mark inferences as inferences.
2. Never invent names, dates, or events that neither the document nor the metadata supports.
3. When a perspective is given, analyse the document through that lens, but do not let the lens override the evidence.
4. Write for an advanced undergraduate or graduate researcher: precise, concrete, free of filler.

## Output Requirements

Respond with a single JSON object and nothing else:

{
  "summary": "2-3 sentence overview of the document and its significance",
  "analysis": "a multi-paragraph analysis in Markdown covering context, authorship and audience, key claims, rhetoric, and limitations of the source",
  "followupQuestions": ["three to five open research questions the document raises"]
}
"#;

/// System prompt for the lightweight analysis
pub const BASIC_ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a historian helping a researcher read a primary source. Be concise and stay close to the text.

Respond with a JSON object with the keys "summary" (one or two sentences), "analysis" (a few short paragraphs in Markdown) and "followupQuestions" (three questions)."#;

/// Build the full initial-analysis prompt
pub fn build_initial_analysis_prompt(request: &AnalysisRequest, source: &str) -> String {
    format!(
        r#"Analyse the following primary source.

## Perspective
{}

## Document Metadata
{}
## Source Text

{}

---

Return the JSON object described in your instructions. Keep the summary short, make the analysis specific to this document, and phrase the follow-up questions so they can guide further archival research."#,
        perspective_line(&request.perspective),
        request.metadata.to_prompt_block(),
        source
    )
}

/// Build the lightweight analysis prompt
pub fn build_basic_analysis_prompt(request: &AnalysisRequest, source: &str) -> String {
    format!(
        r#"Perspective: {}

Metadata:
{}
Source:
{}"#,
        perspective_line(&request.perspective),
        request.metadata.to_prompt_block(),
        source
    )
}

fn perspective_line(perspective: &str) -> &str {
    let perspective = perspective.trim();
    if perspective.is_empty() {
        "A careful, even-handed historian (no particular lens)"
    } else {
        perspective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentMetadata;

    fn request(perspective: &str) -> AnalysisRequest {
        AnalysisRequest {
            source: "Sire, we beg leave to represent".to_string(),
            metadata: DocumentMetadata {
                author: Some("Merchants of Bordeaux".to_string()),
                ..Default::default()
            },
            perspective: perspective.to_string(),
            model: "claude".to_string(),
        }
    }

    #[test]
    fn test_initial_prompt_embeds_all_inputs() {
        let req = request("Marxist historian");
        let prompt = build_initial_analysis_prompt(&req, &req.source);

        assert!(prompt.contains("Marxist historian"));
        assert!(prompt.contains("- Author: Merchants of Bordeaux"));
        assert!(prompt.contains("Sire, we beg leave to represent"));
    }

    #[test]
    fn test_blank_perspective_gets_neutral_lens() {
        let req = request("  ");
        let prompt = build_basic_analysis_prompt(&req, &req.source);
        assert!(prompt.contains("no particular lens"));
    }
}
