//! Rule engine implementation

use crate::{RiskLevel, RiskVerdict};
use detection::GenderLabel;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Risk engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Centroid displacement per frame interval treated as panic motion (px)
    pub panic_speed: f32,
    /// Centroid-to-centroid distance counted as "close" (px)
    pub proximity_threshold: f32,
    /// Minimum male count for the group-proximity rule
    pub group_male_count: usize,
    /// Close (female, male) pairs required to escalate
    pub min_close_pairs: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            panic_speed: 50.0,
            proximity_threshold: 180.0,
            group_male_count: 3,
            min_close_pairs: 2,
        }
    }
}

/// One tracked entity's per-frame signals, as seen by the rule engine
#[derive(Debug, Clone)]
pub struct EntitySignal {
    pub gender: GenderLabel,
    pub centroid: (f32, f32),
    /// Centroid displacement since the previous frame (0 on first appearance)
    pub speed: f32,
    /// Help-signal gesture confirmed for this entity
    pub gesture_confirmed: bool,
}

/// Result of one frame's evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: RiskVerdict,
    /// The group-proximity rule fired; the sole automatic notification trigger
    pub notify: bool,
}

pub const MSG_GESTURE: &str = "Help-signal gesture confirmed";
pub const MSG_PANIC: &str = "Erratic motion detected";
pub const MSG_SURROUNDED: &str = "Woman surrounded by group";
pub const MSG_OVERRIDE: &str = "Manual override active";
pub const MSG_LONE_NIGHT: &str = "Lone woman in low-visibility context";
pub const MSG_LONE_DAY: &str = "Lone woman, environment clear";
pub const MSG_NOMINAL: &str = "All systems nominal";

/// Prioritized rule engine
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Evaluate one frame's signals.
    ///
    /// `entities` must contain only tracks seen in the current frame;
    /// coasting tracks carry no fresh evidence.
    pub fn evaluate(
        &self,
        entities: &[EntitySignal],
        night: bool,
        override_active: bool,
    ) -> Evaluation {
        let females: Vec<&EntitySignal> = entities
            .iter()
            .filter(|e| e.gender == GenderLabel::Female)
            .collect();
        let males: Vec<&EntitySignal> = entities
            .iter()
            .filter(|e| e.gender == GenderLabel::Male)
            .collect();
        let (female_count, male_count) = (females.len(), males.len());

        let gesture = females.iter().any(|e| e.gesture_confirmed);
        let panic = females.iter().any(|e| e.speed > self.config.panic_speed);
        let surrounded = self.group_proximity(&females, &males);
        let lone = female_count == 1 && male_count == 0;

        let (level, message) = if gesture {
            (RiskLevel::Critical, MSG_GESTURE)
        } else if panic {
            (RiskLevel::Critical, MSG_PANIC)
        } else if surrounded {
            (RiskLevel::Critical, MSG_SURROUNDED)
        } else if override_active {
            (RiskLevel::Critical, MSG_OVERRIDE)
        } else if lone && night {
            (RiskLevel::Warning, MSG_LONE_NIGHT)
        } else if lone {
            (RiskLevel::Safe, MSG_LONE_DAY)
        } else {
            (RiskLevel::Safe, MSG_NOMINAL)
        };

        if level != RiskLevel::Safe {
            debug!(
                "Risk {}: {} (f={}, m={})",
                level, message, female_count, male_count
            );
        }

        Evaluation {
            verdict: RiskVerdict {
                level,
                message: message.to_string(),
                female_count,
                male_count,
            },
            notify: surrounded,
        }
    }

    /// Group-proximity rule: at least one woman, a male group of the
    /// configured size, and enough close (female, male) centroid pairs.
    fn group_proximity(&self, females: &[&EntitySignal], males: &[&EntitySignal]) -> bool {
        if females.is_empty() || males.len() < self.config.group_male_count {
            return false;
        }
        let mut close_pairs = 0usize;
        for f in females {
            for m in males {
                let dx = f.centroid.0 - m.centroid.0;
                let dy = f.centroid.1 - m.centroid.1;
                if (dx * dx + dy * dy).sqrt() < self.config.proximity_threshold {
                    close_pairs += 1;
                }
            }
        }
        close_pairs >= self.config.min_close_pairs
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}
