//! Display classification of raw metrics. Every function is total and
//! falls back to a placeholder rather than failing.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ModelError;
use crate::models::{Athlete, RiskLevel, PLACEHOLDER};

pub const ELITE_SCORE: i32 = 80;
pub const GOOD_SCORE: i32 = 60;
pub const VALGUS_WARN_DEGREES: f64 = 10.0;
pub const VALGUS_DANGER_DEGREES: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreTier {
    Elite,
    Good,
    NeedsWork,
}

impl ScoreTier {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreTier::Elite => "Elite",
            ScoreTier::Good => "Good",
            ScoreTier::NeedsWork => "Needs Work",
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            ScoreTier::Elite => "score-high",
            ScoreTier::Good => "score-mid",
            ScoreTier::NeedsWork => "score-low",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Missing scores classify as 0.
pub fn score_tier(score: Option<i32>) -> ScoreTier {
    let score = score.unwrap_or(0);
    if score >= ELITE_SCORE {
        ScoreTier::Elite
    } else if score >= GOOD_SCORE {
        ScoreTier::Good
    } else {
        ScoreTier::NeedsWork
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValgusTier {
    Unknown,
    Good,
    Warn,
    Danger,
}

impl ValgusTier {
    pub fn class(&self) -> &'static str {
        match self {
            ValgusTier::Unknown => "valgus-unknown",
            ValgusTier::Good => "valgus-good",
            ValgusTier::Warn => "valgus-warn",
            ValgusTier::Danger => "valgus-danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValgusReading {
    pub tier: ValgusTier,
    pub label: String,
}

pub fn valgus_tier(angle: Option<f64>) -> ValgusTier {
    match angle {
        Some(angle) if angle.is_finite() => {
            if angle < VALGUS_WARN_DEGREES {
                ValgusTier::Good
            } else if angle < VALGUS_DANGER_DEGREES {
                ValgusTier::Warn
            } else {
                ValgusTier::Danger
            }
        }
        _ => ValgusTier::Unknown,
    }
}

pub fn valgus_reading(angle: Option<f64>) -> ValgusReading {
    let tier = valgus_tier(angle);
    let label = match (tier, angle) {
        (ValgusTier::Unknown, _) | (_, None) => PLACEHOLDER.to_string(),
        (_, Some(angle)) => format!("{angle:.1}°"),
    };
    ValgusReading { tier, label }
}

/// Impact metrics shown on the athlete metric cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricKind {
    ValgusAngle,
    PeakVerticalG,
    PeakLateralG,
    RotationalVelocity,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::ValgusAngle,
        MetricKind::PeakVerticalG,
        MetricKind::PeakLateralG,
        MetricKind::RotationalVelocity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::ValgusAngle => "Avg valgus",
            MetricKind::PeakVerticalG => "Avg vertical G",
            MetricKind::PeakLateralG => "Avg lateral G",
            MetricKind::RotationalVelocity => "Avg rotational velocity",
        }
    }

    /// Inclusive upper bounds of the good and warn bands. Valgus is the
    /// exception and uses the strict valgus thresholds.
    fn limits(&self) -> (f64, f64) {
        match self {
            MetricKind::ValgusAngle => (VALGUS_WARN_DEGREES, VALGUS_DANGER_DEGREES),
            MetricKind::PeakVerticalG => (4.0, 5.5),
            MetricKind::PeakLateralG => (2.0, 3.0),
            MetricKind::RotationalVelocity => (2.5, 3.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricBand {
    Unknown,
    Good,
    Warn,
    Danger,
}

impl MetricBand {
    pub fn label(&self) -> &'static str {
        match self {
            MetricBand::Unknown => "unknown",
            MetricBand::Good => "good",
            MetricBand::Warn => "warn",
            MetricBand::Danger => "danger",
        }
    }
}

impl fmt::Display for MetricBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn metric_band(kind: MetricKind, value: Option<f64>) -> MetricBand {
    let value = match value {
        Some(value) if value.is_finite() => value,
        _ => return MetricBand::Unknown,
    };
    if kind == MetricKind::ValgusAngle {
        return match valgus_tier(Some(value)) {
            ValgusTier::Good => MetricBand::Good,
            ValgusTier::Warn => MetricBand::Warn,
            ValgusTier::Danger => MetricBand::Danger,
            ValgusTier::Unknown => MetricBand::Unknown,
        };
    }
    let (good, warn) = kind.limits();
    if value <= good {
        MetricBand::Good
    } else if value <= warn {
        MetricBand::Warn
    } else {
        MetricBand::Danger
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBadge {
    Safe,
    Danger,
}

/// Only an explicit LOW is safe; HIGH, missing and unrecognized values all
/// render as danger.
pub fn risk_badge(risk: Option<RiskLevel>) -> RiskBadge {
    match risk {
        Some(RiskLevel::Low) => RiskBadge::Safe,
        _ => RiskBadge::Danger,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeBracket {
    Under15,
    From15To17,
    Over17,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 3] = [
        AgeBracket::Under15,
        AgeBracket::From15To17,
        AgeBracket::Over17,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::Under15 => "Under 15",
            AgeBracket::From15To17 => "15-17",
            AgeBracket::Over17 => "Over 17",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeBracket {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgeBracket::ALL
            .into_iter()
            .find(|bracket| bracket.label() == s)
            .ok_or_else(|| ModelError::UnknownAgeGroup(s.to_string()))
    }
}

pub fn age_bracket(age: u32) -> AgeBracket {
    if age < 15 {
        AgeBracket::Under15
    } else if age <= 17 {
        AgeBracket::From15To17
    } else {
        AgeBracket::Over17
    }
}

/// Stored score of an athlete record: `avgEfficiencyScore`, then the legacy
/// `efficiencyScore`, then 0.
pub fn resolve_score(athlete: &Athlete) -> i32 {
    athlete
        .avg_efficiency_score
        .or(athlete.efficiency_score)
        .unwrap_or(0)
}

pub fn rank_medal(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        other => format!("#{other}"),
    }
}

/// Formats an optional metric with a fixed number of decimals.
pub fn format_metric(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.decimals$}"),
        _ => PLACEHOLDER.to_string(),
    }
}
