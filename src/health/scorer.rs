//! Composite health score and its classification

use serde::{Deserialize, Serialize};

/// Deduction weights applied to a perfect score of 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points removed per percent of host memory in use
    pub memory_weight: f64,
    /// Points removed per unit of 1-minute load average
    pub load_multiplier: f64,
    /// Upper bound on the load deduction
    pub load_cap: f64,
    pub throttling_penalty: f64,
    pub cold_start_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            memory_weight: 0.4,
            load_multiplier: 10.0,
            load_cap: 20.0,
            throttling_penalty: 20.0,
            cold_start_penalty: 10.0,
        }
    }
}

/// Signals the score is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub memory_used_percent: f64,
    pub load_1m: f64,
    pub throttling_detected: bool,
    pub cold_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Optimal,
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        match score {
            81..=u8::MAX => Self::Optimal,
            61..=80 => Self::Healthy,
            51..=60 => Self::Warning,
            _ => Self::Critical,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Optimal => "Optimal",
            Self::Healthy => "Healthy",
            Self::Warning => "Warning: system usage is high",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Whether `uptime_seconds` still falls inside the cold-start window.
pub fn is_cold_start(uptime_seconds: f64, window_secs: f64) -> bool {
    uptime_seconds < window_secs
}

/// Score the inputs on a 0-100 scale (floored, clamped).
pub fn score(inputs: &ScoreInputs, weights: &ScoringWeights) -> u8 {
    let memory = inputs.memory_used_percent.clamp(0.0, 100.0);
    let load = (inputs.load_1m.max(0.0) * weights.load_multiplier).min(weights.load_cap);

    let mut score = 100.0;
    score -= memory * weights.memory_weight;
    score -= load;
    if inputs.throttling_detected {
        score -= weights.throttling_penalty;
    }
    if inputs.cold_start {
        score -= weights.cold_start_penalty;
    }

    if score.is_nan() {
        return 0;
    }
    score.floor().clamp(0.0, 100.0) as u8
}
