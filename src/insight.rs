use serde::{Deserialize, Serialize};

/// Tone of a generated observation, consumed by the UI for icon/color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Highlight,
    Positive,
    Negative,
    Opportunity,
    Info,
}

/// One ranked natural-language observation about the filtered data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub text: String,
}

impl Insight {
    pub fn new(kind: InsightKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}
