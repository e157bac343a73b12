//! Prompt for counter-narrative generation

use crate::model::AnalysisRequest;

/// Analytical lenses the counter-narrative may draw on (at most two per reply)
pub const COUNTER_NARRATIVE_LENSES: [&str; 5] = [
    "Subaltern perspective: whose voices are absent or mediated, and how would they tell it?",
    "Power structures: which institutions, hierarchies or interests does the document serve?",
    "Historical contingency: what alternative outcomes were possible at the time of writing?",
    "Silences and omissions: what does the document conspicuously leave out?",
    "Cross-cultural context: how would a contemporary from another culture or region read it?",
];

pub const COUNTER_NARRATIVE_SYSTEM_PROMPT: &str = "You are a critical historian who writes concise, evidence-aware counter-narratives to primary sources.";

/// Build the counter-narrative prompt
pub fn build_counter_narrative_prompt(request: &AnalysisRequest) -> String {
    let lenses = COUNTER_NARRATIVE_LENSES
        .iter()
        .enumerate()
        .map(|(i, lens)| format!("{}. {}", i + 1, lens))
        .collect::<Vec<_>>()
        .join("\n");

    let perspective = request.perspective.trim();
    let perspective = if perspective.is_empty() {
        "None specified"
    } else {
        perspective
    };

    format!(
        r#"Write a counter-narrative to the primary source below: an alternative reading that challenges the account the document presents on its own terms.

## Constraints
- At most two paragraphs.
- Use at most two of the following analytical lenses, and name the lenses you use:
{lenses}
- Stay anchored in the source; flag speculation as speculation.
- Do not summarise the document; argue against or around it.

## Researcher Perspective
{perspective}

## Document Metadata
{metadata}
## Source Text

{source}"#,
        metadata = request.metadata.to_prompt_block(),
        source = request.source
    )
}
