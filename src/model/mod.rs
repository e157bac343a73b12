pub mod analysis;
pub mod config;
pub mod narrative;
pub mod panel;
pub mod processing;

pub use analysis::*;
pub use config::{AnalysisSettings, Config, ProviderSettings};
pub use narrative::CounterNarrativeResponse;
pub use panel::Panel;
pub use processing::{ProcessingMetadata, ProcessingState, ProcessingStep, TransitionError};
