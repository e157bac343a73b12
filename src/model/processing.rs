//! Coarse progress state for an analysis fetch
//!
//! Steps form a linear chain ending in one of two terminal steps. Moves are only
//! ever forward (or a same-step metadata refresh); anything else is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStep {
    SelectingModel,
    AnalyzingSource,
    BuildingPrompt,
    SendingRequest,
    ReceivingResponse,
    ProcessingResults,
    AnalysisFailed,
}

impl ProcessingStep {
    /// All steps in chain order
    pub const ALL: [ProcessingStep; 7] = [
        ProcessingStep::SelectingModel,
        ProcessingStep::AnalyzingSource,
        ProcessingStep::BuildingPrompt,
        ProcessingStep::SendingRequest,
        ProcessingStep::ReceivingResponse,
        ProcessingStep::ProcessingResults,
        ProcessingStep::AnalysisFailed,
    ];

    fn ordinal(self) -> u8 {
        match self {
            ProcessingStep::SelectingModel => 0,
            ProcessingStep::AnalyzingSource => 1,
            ProcessingStep::BuildingPrompt => 2,
            ProcessingStep::SendingRequest => 3,
            ProcessingStep::ReceivingResponse => 4,
            // Both terminals sit at the end of the chain
            ProcessingStep::ProcessingResults | ProcessingStep::AnalysisFailed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessingStep::ProcessingResults | ProcessingStep::AnalysisFailed
        )
    }

    /// Transition table for the chain
    pub fn can_advance_to(self, next: ProcessingStep) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        match next {
            ProcessingStep::AnalysisFailed => true,
            _ => next.ordinal() >= self.ordinal(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStep::SelectingModel => "selecting-model",
            ProcessingStep::AnalyzingSource => "analyzing-source",
            ProcessingStep::BuildingPrompt => "building-prompt",
            ProcessingStep::SendingRequest => "sending-request",
            ProcessingStep::ReceivingResponse => "receiving-response",
            ProcessingStep::ProcessingResults => "processing-results",
            ProcessingStep::AnalysisFailed => "analysis-failed",
        }
    }
}

impl fmt::Display for ProcessingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form details displayed next to the current step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl ProcessingMetadata {
    /// Overlay the fields set in `other`
    pub fn merge(&mut self, other: ProcessingMetadata) {
        if other.elapsed_ms.is_some() {
            self.elapsed_ms = other.elapsed_ms;
        }
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.content_length.is_some() {
            self.content_length = other.content_length;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid processing transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: ProcessingStep,
    pub to: ProcessingStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessingState {
    pub step: ProcessingStep,
    #[serde(default)]
    pub metadata: ProcessingMetadata,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            step: ProcessingStep::SelectingModel,
            metadata: ProcessingMetadata::default(),
        }
    }
}

impl ProcessingState {
    /// Return to the first step, discarding metadata
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move to `next`, merging metadata; backward moves leave the state untouched
    pub fn advance(
        &mut self,
        next: ProcessingStep,
        metadata: ProcessingMetadata,
    ) -> Result<(), TransitionError> {
        if !self.step.can_advance_to(next) {
            return Err(TransitionError {
                from: self.step,
                to: next,
            });
        }
        self.step = next;
        self.metadata.merge(metadata);
        Ok(())
    }

    pub fn is_failed(&self) -> bool {
        self.step == ProcessingStep::AnalysisFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walks_the_chain() {
        let mut state = ProcessingState::default();
        for step in &ProcessingStep::ALL[1..6] {
            state.advance(*step, ProcessingMetadata::default()).unwrap();
        }
        assert_eq!(state.step, ProcessingStep::ProcessingResults);
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let mut state = ProcessingState::default();
        state
            .advance(ProcessingStep::SendingRequest, ProcessingMetadata::default())
            .unwrap();

        let err = state
            .advance(ProcessingStep::BuildingPrompt, ProcessingMetadata::default())
            .unwrap_err();

        assert_eq!(err.from, ProcessingStep::SendingRequest);
        assert_eq!(state.step, ProcessingStep::SendingRequest);
    }

    #[test]
    fn test_same_step_refreshes_metadata() {
        let mut state = ProcessingState::default();
        state
            .advance(
                ProcessingStep::SendingRequest,
                ProcessingMetadata {
                    provider: Some("initial-analysis".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        state
            .advance(
                ProcessingStep::SendingRequest,
                ProcessingMetadata {
                    provider: Some("analysis".to_string()),
                    elapsed_ms: Some(40),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(state.metadata.provider.as_deref(), Some("analysis"));
        assert_eq!(state.metadata.elapsed_ms, Some(40));
    }

    #[test]
    fn test_terminal_steps_are_final() {
        assert!(ProcessingStep::ReceivingResponse.can_advance_to(ProcessingStep::AnalysisFailed));
        assert!(ProcessingStep::SelectingModel.can_advance_to(ProcessingStep::AnalysisFailed));
        assert!(!ProcessingStep::AnalysisFailed.can_advance_to(ProcessingStep::ProcessingResults));
        assert!(!ProcessingStep::ProcessingResults.can_advance_to(ProcessingStep::AnalysisFailed));
    }

    #[test]
    fn test_reset_returns_to_first_step() {
        let mut state = ProcessingState::default();
        state
            .advance(ProcessingStep::AnalysisFailed, ProcessingMetadata::default())
            .unwrap();
        state.reset();
        assert_eq!(state, ProcessingState::default());
    }

    #[test]
    fn test_steps_serialize_as_kebab_case() {
        let json = serde_json::to_string(&ProcessingStep::ReceivingResponse).unwrap();
        assert_eq!(json, "\"receiving-response\"");
        assert_eq!(ProcessingStep::AnalysisFailed.to_string(), "analysis-failed");
    }
}
