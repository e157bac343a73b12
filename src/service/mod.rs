pub mod analysis;
pub mod cache;
pub mod cache_keys;
pub mod counter_narrative;
pub mod llm;

pub use analysis::AnalysisService;
pub use cache::AnalysisCache;
pub use counter_narrative::CounterNarrativeService;
pub use llm::LlmRouter;
