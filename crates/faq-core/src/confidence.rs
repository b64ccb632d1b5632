//! Confidence label derived from the top score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceConfig;

/// Confidence band of a retrieval outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Classify a score: `< medium` is low, `[medium, high)` medium, `>= high` high.
    pub fn classify(score: f32, bands: &ConfidenceConfig) -> Self {
        if score >= bands.high {
            Self::High
        } else if score >= bands.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}
