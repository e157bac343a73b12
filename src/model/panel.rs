use serde::{Deserialize, Serialize};

/// Analysis views a researcher can switch between
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Panel {
    #[default]
    Analysis,
    DetailedAnalysis,
    Extract,
    References,
    Roleplay,
    CounterNarrative,
    Translate,
    Highlight,
}

impl Panel {
    /// Panels that never trigger an automatic analysis on mount
    pub const DEFAULT_EXCLUDED: [Panel; 2] = [Panel::References, Panel::Roleplay];
}
