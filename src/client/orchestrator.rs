//! Analysis orchestration
//!
//! Decides when an analysis should be fetched, guarantees at most one fetch is in
//! flight, and walks the configured strategies until one produces a result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::ClientConfig;
use super::progress::{ProgressEmitter, StepReporter};
use super::state::{SessionAction, SessionState, SessionStore};
use super::strategy::{AnalysisStrategy, HttpAnalysisStrategy, StrategyError};
use crate::model::{
    AnalysisExchange, AnalysisRequest, Panel, ProcessingMetadata, ProcessingStep,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotArmed,
    MissingInputs,
    InFlight,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No analysis strategies configured")]
    NoStrategies,

    #[error("All {attempts} analysis strategies failed, last was {strategy}: {source}")]
    Exhausted {
        attempts: usize,
        strategy: String,
        #[source]
        source: StrategyError,
    },
}

#[derive(Debug)]
pub enum FetchOutcome {
    Skipped(SkipReason),
    /// Result stored in the session
    Completed { strategy: String },
    /// Result discarded because the active draft changed mid-flight
    Stale { strategy: String },
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    model: String,
    perspective: String,
}

impl Selection {
    fn of(state: &SessionState) -> Self {
        Self {
            model: state.selected_model.clone(),
            perspective: state.selected_perspective.clone(),
        }
    }
}

/// Clears the in-flight marker and loading flag however the fetch ends
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    store: &'a SessionStore,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.dispatch(SessionAction::SetLoading(false));
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

pub struct AnalysisOrchestrator {
    store: SessionStore,
    strategies: Vec<Arc<dyn AnalysisStrategy>>,
    progress: ProgressEmitter,
    excluded_panels: Vec<Panel>,
    armed: AtomicBool,
    in_flight: AtomicBool,
    last_selection: Mutex<Option<Selection>>,
}

impl AnalysisOrchestrator {
    pub fn new(store: SessionStore, strategies: Vec<Arc<dyn AnalysisStrategy>>) -> Self {
        Self {
            store,
            strategies,
            progress: ProgressEmitter::new(),
            excluded_panels: Panel::DEFAULT_EXCLUDED.to_vec(),
            armed: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            last_selection: Mutex::new(None),
        }
    }

    /// Primary endpoint first, then the lenient fallback
    pub fn with_http_defaults(
        store: SessionStore,
        config: &ClientConfig,
    ) -> Result<Self, StrategyError> {
        let strategies: Vec<Arc<dyn AnalysisStrategy>> = vec![
            Arc::new(HttpAnalysisStrategy::primary(config)?),
            Arc::new(HttpAnalysisStrategy::fallback(config)?),
        ];
        Ok(Self::new(store, strategies).with_excluded_panels(config.excluded_panels.clone()))
    }

    pub fn with_progress(mut self, progress: ProgressEmitter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_excluded_panels(mut self, panels: Vec<Panel>) -> Self {
        self.excluded_panels = panels;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn progress(&self) -> &ProgressEmitter {
        &self.progress
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Arm a fetch when nothing is cached and the active panel wants one
    pub fn on_mount(&self) -> bool {
        let state = self.store.snapshot();
        *self.lock_selection() = Some(Selection::of(&state));

        if state.analysis.is_some() || self.excluded_panels.contains(&state.active_panel) {
            tracing::debug!(panel = ?state.active_panel, "Mounted without arming analysis");
            return false;
        }

        self.arm();
        true
    }

    pub fn select_model(&self, model: impl Into<String>) -> bool {
        self.store
            .dispatch(SessionAction::SelectModel(model.into()));
        self.observe_selection()
    }

    pub fn select_perspective(&self, perspective: impl Into<String>) -> bool {
        self.store
            .dispatch(SessionAction::SelectPerspective(perspective.into()));
        self.observe_selection()
    }

    /// Compare the current model/perspective with the last one seen and re-arm on change
    pub fn observe_selection(&self) -> bool {
        let state = self.store.snapshot();
        let current = Selection::of(&state);

        let changed = {
            let mut last = self.lock_selection();
            let changed = last.as_ref().is_some_and(|previous| *previous != current);
            *last = Some(current);
            changed
        };

        if !changed || !state.has_inputs() {
            return false;
        }

        tracing::debug!(
            model = %state.selected_model,
            perspective = %state.selected_perspective,
            "Selection changed, re-arming analysis"
        );
        self.store.dispatch(SessionAction::ClearAnalysis);
        self.arm();
        true
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, Option<Selection>> {
        self.last_selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the armed fetch, if any
    pub async fn try_fetch(&self) -> FetchOutcome {
        if !self.is_armed() {
            return FetchOutcome::Skipped(SkipReason::NotArmed);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Analysis already in flight");
            return FetchOutcome::Skipped(SkipReason::InFlight);
        }

        // Disarm before reading the inputs so a re-arm after this point survives
        if !self.armed.swap(false, Ordering::SeqCst) {
            self.in_flight.store(false, Ordering::SeqCst);
            return FetchOutcome::Skipped(SkipReason::NotArmed);
        }

        let state = self.store.snapshot();
        let Some(request) = state.analysis_request() else {
            tracing::debug!("Analysis armed but source or metadata missing");
            self.arm();
            self.in_flight.store(false, Ordering::SeqCst);
            return FetchOutcome::Skipped(SkipReason::MissingInputs);
        };

        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            store: &self.store,
        };

        self.store.dispatch(SessionAction::SetLoading(true));
        self.store.dispatch(SessionAction::ResetProcessing);

        let draft_id = state.active_draft_id.clone();
        let reporter = StepReporter::new(self.store.clone(), self.progress.clone());
        self.report_preparation(&reporter, &request);

        match self.run_strategies(&request, &reporter).await {
            Ok((strategy, exchange)) => {
                let outcome = if self.store.snapshot().active_draft_id == draft_id {
                    self.store.dispatch(SessionAction::StoreAnalysis(exchange));
                    FetchOutcome::Completed {
                        strategy: strategy.clone(),
                    }
                } else {
                    tracing::debug!(strategy = %strategy, "Draft changed during analysis, discarding result");
                    FetchOutcome::Stale {
                        strategy: strategy.clone(),
                    }
                };

                reporter.advance(
                    ProcessingStep::ProcessingResults,
                    ProcessingMetadata::default(),
                );
                tracing::info!(
                    strategy = %strategy,
                    model = %request.model,
                    elapsed_ms = reporter.elapsed().as_millis() as u64,
                    "Analysis completed"
                );
                outcome
            }
            Err(e) => {
                reporter.advance(ProcessingStep::AnalysisFailed, ProcessingMetadata::default());
                tracing::error!(
                    model = %request.model,
                    error = %e,
                    elapsed_ms = reporter.elapsed().as_millis() as u64,
                    "Analysis failed"
                );
                FetchOutcome::Failed(e)
            }
        }
    }

    fn report_preparation(&self, reporter: &StepReporter, request: &AnalysisRequest) {
        reporter.advance(
            ProcessingStep::SelectingModel,
            ProcessingMetadata {
                provider: Some(request.model.clone()),
                ..Default::default()
            },
        );
        reporter.advance(
            ProcessingStep::AnalyzingSource,
            ProcessingMetadata {
                content_length: Some(request.source.chars().count() as u64),
                ..Default::default()
            },
        );
        reporter.advance(ProcessingStep::BuildingPrompt, ProcessingMetadata::default());
    }

    async fn run_strategies(
        &self,
        request: &AnalysisRequest,
        reporter: &StepReporter,
    ) -> Result<(String, AnalysisExchange), FetchError> {
        let mut last_failure = None;

        for (attempt, strategy) in self.strategies.iter().enumerate() {
            match strategy.fetch(request, reporter).await {
                Ok(exchange) => {
                    if attempt > 0 {
                        tracing::info!(strategy = strategy.name(), "Analysis recovered by fallback");
                    }
                    return Ok((strategy.name().to_string(), exchange));
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "Analysis strategy failed"
                    );
                    last_failure = Some((strategy.name().to_string(), e));
                }
            }
        }

        match last_failure {
            Some((strategy, source)) => Err(FetchError::Exhausted {
                attempts: self.strategies.len(),
                strategy,
                source,
            }),
            None => Err(FetchError::NoStrategies),
        }
    }
}
