//! Progress events for the analysis workflow
//!
//! Step events are emitted by the orchestrator as the fetch actually moves through its
//! lifecycle. The detailed-analysis panel has no server-side progress, so a ticker
//! walks a fixed list of phases on a timer while that panel is waiting.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::state::{SessionAction, SessionState, SessionStore};
use crate::model::{Panel, ProcessingMetadata, ProcessingStep};

const EVENT_CAPACITY: usize = 64;

pub const DETAILED_TICK: Duration = Duration::from_millis(1500);

pub const DETAILED_PHASES: [&str; 7] = [
    "Reading the source",
    "Identifying the author and context",
    "Examining rhetoric and language",
    "Tracing historical background",
    "Weighing reliability and bias",
    "Connecting to the historiography",
    "Drafting the detailed analysis",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedProgress {
    pub phase: &'static str,
    /// 1-based
    pub current_step: usize,
    pub total_steps: usize,
    pub elapsed: Duration,
    pub estimated_total: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Step {
        step: ProcessingStep,
        metadata: ProcessingMetadata,
    },
    Detailed(DetailedProgress),
}

/// Fan-out of progress events to any number of observers
#[derive(Clone)]
pub struct ProgressEmitter {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; having no observers is not an error
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Records processing steps for one fetch, in the store and as events
pub struct StepReporter {
    store: SessionStore,
    emitter: ProgressEmitter,
    started: Instant,
}

impl StepReporter {
    pub fn new(store: SessionStore, emitter: ProgressEmitter) -> Self {
        Self {
            store,
            emitter,
            started: Instant::now(),
        }
    }

    /// Advance to `step`, returning false when the step would move backwards
    pub fn advance(&self, step: ProcessingStep, mut metadata: ProcessingMetadata) -> bool {
        let current = self.store.snapshot().processing.step;
        if !current.can_advance_to(step) {
            tracing::debug!(from = %current, to = %step, "Ignoring out-of-order processing step");
            return false;
        }

        metadata.elapsed_ms = Some(self.started.elapsed().as_millis() as u64);
        self.store
            .dispatch(SessionAction::AdvanceProcessing(step, metadata.clone()));
        self.emitter.emit(ProgressEvent::Step { step, metadata });
        true
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Timer-driven phases for the detailed-analysis panel
pub struct DetailedProgressTicker {
    store: SessionStore,
    emitter: ProgressEmitter,
    period: Duration,
}

impl DetailedProgressTicker {
    pub fn new(store: SessionStore, emitter: ProgressEmitter) -> Self {
        Self {
            store,
            emitter,
            period: DETAILED_TICK,
        }
    }

    pub fn should_run(state: &SessionState) -> bool {
        state.active_panel == Panel::DetailedAnalysis
            && state.is_loading
            && state.detailed_analysis.is_none()
    }

    /// Tick until the panel stops waiting; returns the number of ticks emitted
    pub async fn run(self) -> usize {
        let mut rx = self.store.subscribe();
        if !Self::should_run(&rx.borrow_and_update()) {
            return 0;
        }

        let total_steps = DETAILED_PHASES.len();
        let estimated_total = self.period * total_steps as u32;
        let started = Instant::now();
        let mut interval = tokio::time::interval_at(started + self.period, self.period);
        let mut ticks = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !Self::should_run(&rx.borrow()) {
                        break;
                    }
                    let index = ticks.min(total_steps - 1);
                    self.emitter.emit(ProgressEvent::Detailed(DetailedProgress {
                        phase: DETAILED_PHASES[index],
                        current_step: index + 1,
                        total_steps,
                        elapsed: started.elapsed(),
                        estimated_total,
                    }));
                    ticks += 1;
                }
                changed = rx.changed() => {
                    if changed.is_err() || !Self::should_run(&rx.borrow_and_update()) {
                        break;
                    }
                }
            }
        }

        tracing::debug!(ticks, "Detailed progress ticker stopped");
        ticks
    }

    pub fn spawn(self) -> TickerHandle {
        TickerHandle {
            handle: Some(tokio::spawn(self.run())),
        }
    }

    /// Start a ticker each time the detailed panel begins waiting, until the handle drops
    pub fn watch(store: SessionStore, emitter: ProgressEmitter) -> TickerHandle {
        let handle = tokio::spawn(async move {
            let mut rx = store.subscribe();
            let mut runs = 0;
            loop {
                if rx.wait_for(Self::should_run).await.is_err() {
                    break;
                }
                DetailedProgressTicker::new(store.clone(), emitter.clone())
                    .run()
                    .await;
                runs += 1;
                if rx.wait_for(|state| !Self::should_run(state)).await.is_err() {
                    break;
                }
            }
            runs
        });
        TickerHandle {
            handle: Some(handle),
        }
    }
}

/// Owns a ticker task and aborts it on drop
pub struct TickerHandle {
    handle: Option<JoinHandle<usize>>,
}

impl TickerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to stop on its own
    pub async fn join(mut self) -> Option<usize> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
