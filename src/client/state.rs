//! Researcher session state
//!
//! All mutations go through [`SessionAction`]; [`SessionState::apply`] is pure and the
//! [`SessionStore`] publishes each new state to its subscribers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{
    AnalysisExchange, AnalysisRequest, AnalysisResult, DocumentMetadata, Panel,
    ProcessingMetadata, ProcessingState, ProcessingStep,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub source_text: Option<String>,
    pub metadata: Option<DocumentMetadata>,
    pub selected_model: String,
    pub selected_perspective: String,
    pub active_panel: Panel,
    pub active_draft_id: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub raw_prompt: Option<String>,
    pub raw_response: Option<String>,
    pub is_loading: bool,
    pub processing: ProcessingState,
    pub detailed_analysis: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    SetSource(Option<String>),
    SetMetadata(Option<DocumentMetadata>),
    SelectModel(String),
    SelectPerspective(String),
    SetPanel(Panel),
    /// Switch drafts; any analysis belonging to the previous draft is dropped
    OpenDraft(Option<String>),
    ClearAnalysis,
    StoreAnalysis(AnalysisExchange),
    SetLoading(bool),
    ResetProcessing,
    AdvanceProcessing(ProcessingStep, ProcessingMetadata),
    SetDetailedResult(Option<String>),
}

impl SessionState {
    /// Return the state that results from `action`
    ///
    /// Out-of-order processing steps leave the processing state unchanged.
    pub fn apply(&self, action: SessionAction) -> SessionState {
        let mut next = self.clone();
        match action {
            SessionAction::SetSource(source) => next.source_text = source,
            SessionAction::SetMetadata(metadata) => next.metadata = metadata,
            SessionAction::SelectModel(model) => next.selected_model = model,
            SessionAction::SelectPerspective(perspective) => {
                next.selected_perspective = perspective
            }
            SessionAction::SetPanel(panel) => next.active_panel = panel,
            SessionAction::OpenDraft(id) => {
                next.active_draft_id = id;
                next.clear_analysis();
                next.detailed_analysis = None;
            }
            SessionAction::ClearAnalysis => next.clear_analysis(),
            SessionAction::StoreAnalysis(exchange) => {
                next.analysis = Some(exchange.analysis);
                next.raw_prompt = Some(exchange.raw_prompt);
                next.raw_response = Some(exchange.raw_response);
            }
            SessionAction::SetLoading(loading) => next.is_loading = loading,
            SessionAction::ResetProcessing => next.processing.reset(),
            SessionAction::AdvanceProcessing(step, metadata) => {
                if let Err(e) = next.processing.advance(step, metadata) {
                    tracing::debug!(error = %e, "Ignoring processing transition");
                }
            }
            SessionAction::SetDetailedResult(result) => next.detailed_analysis = result,
        }
        next
    }

    fn clear_analysis(&mut self) {
        self.analysis = None;
        self.raw_prompt = None;
        self.raw_response = None;
    }

    /// Whether both source text and metadata are present
    pub fn has_inputs(&self) -> bool {
        self.source_text
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
            && self.metadata.is_some()
    }

    /// Build a request from the current inputs, if they are complete
    pub fn analysis_request(&self) -> Option<AnalysisRequest> {
        if !self.has_inputs() {
            return None;
        }
        Some(AnalysisRequest {
            source: self.source_text.clone()?,
            metadata: self.metadata.clone()?,
            perspective: self.selected_perspective.clone(),
            model: self.selected_model.clone(),
        })
    }
}

/// Shared, observable session state
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: SessionAction) {
        self.tx.send_modify(|state| {
            let next = state.apply(action);
            *state = next;
        });
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionState::default())
    }
}
