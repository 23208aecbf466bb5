//! Risk Evaluator
//!
//! Fuses per-frame signals (entity counts, motion, gesture confirmation,
//! proximity, night context, manual override) into a single risk verdict.
//! The verdict is recomputed fresh every frame; only the persistence counters
//! upstream and the manual override carry state across frames.
//!
//! Rule precedence is a fixed total order. CRITICAL dominates WARNING
//! dominates SAFE; when several CRITICAL triggers coincide the message is
//! chosen gesture > panic > group-proximity > manual override.

pub mod engine;
pub mod overrides;

pub use engine::{EntitySignal, Evaluation, RiskConfig, RiskEngine};
pub use overrides::ManualOverride;

use serde::{Deserialize, Serialize};

/// Safety classification level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Safe,
    Warning,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame risk verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub level: RiskLevel,
    pub message: String,
    pub female_count: usize,
    pub male_count: usize,
}

impl RiskVerdict {
    pub fn safe(message: &str, female_count: usize, male_count: usize) -> Self {
        Self {
            level: RiskLevel::Safe,
            message: message.to_string(),
            female_count,
            male_count,
        }
    }
}
