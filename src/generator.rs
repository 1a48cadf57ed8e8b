//! Synthetic jump/cut events for demonstration and seeding.
//!
//! The randomness source is injected so batches are reproducible from a
//! seed. Lower baselines draw HIGH risk more often, and HIGH-risk events
//! draw their valgus angle from a disjoint, higher band.

use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::models::{JumpEvent, MovementType, RiskLevel};

pub const RISK_BASELINE_THRESHOLD: i32 = 70;
pub const HIGH_RISK_PROBABILITY_BELOW_THRESHOLD: f64 = 0.40;
pub const HIGH_RISK_PROBABILITY_AT_THRESHOLD: f64 = 0.15;
pub const SCORE_JITTER: i32 = 15;

pub const LOW_RISK_VALGUS: Range<f64> = 3.0..12.0;
pub const HIGH_RISK_VALGUS: Range<f64> = 12.0..22.0;
pub const PEAK_VERTICAL_G: Range<f64> = 2.5..6.5;
pub const PEAK_LATERAL_G: Range<f64> = 0.8..3.5;
pub const PEAK_ROTATIONAL_VEL: Range<f64> = 1.0..4.5;
pub const VERTICAL_STD_DEV: Range<f64> = 0.05..0.3;
pub const LATERAL_STD_DEV: Range<f64> = 0.04..0.2;
pub const GAP_MINUTES: Range<f64> = 5.0..120.0;

/// Events per athlete when seeding, half-open.
pub const SEED_BATCH: Range<usize> = 25..50;

pub const LOW_RISK_TIPS: [&str; 4] = [
    "Great landing mechanics!",
    "Excellent knee alignment.",
    "Good cut technique.",
    "Solid deceleration.",
];

pub const HIGH_RISK_TIPS: [&str; 4] = [
    "Knee valgus detected — focus on hip abductor strength.",
    "High impact load — check landing mechanics.",
    "Excessive trunk lean observed.",
    "Reduce rotational stress on cuts.",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub risk_baseline_threshold: i32,
    pub high_risk_probability_below_threshold: f64,
    pub high_risk_probability_at_threshold: f64,
    pub score_jitter: i32,
    pub low_risk_valgus: Range<f64>,
    pub high_risk_valgus: Range<f64>,
    pub peak_vertical_g: Range<f64>,
    pub peak_lateral_g: Range<f64>,
    pub peak_rotational_vel: Range<f64>,
    pub vertical_std_dev: Range<f64>,
    pub lateral_std_dev: Range<f64>,
    pub gap_minutes: Range<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            risk_baseline_threshold: RISK_BASELINE_THRESHOLD,
            high_risk_probability_below_threshold: HIGH_RISK_PROBABILITY_BELOW_THRESHOLD,
            high_risk_probability_at_threshold: HIGH_RISK_PROBABILITY_AT_THRESHOLD,
            score_jitter: SCORE_JITTER,
            low_risk_valgus: LOW_RISK_VALGUS,
            high_risk_valgus: HIGH_RISK_VALGUS,
            peak_vertical_g: PEAK_VERTICAL_G,
            peak_lateral_g: PEAK_LATERAL_G,
            peak_rotational_vel: PEAK_ROTATIONAL_VEL,
            vertical_std_dev: VERTICAL_STD_DEV,
            lateral_std_dev: LATERAL_STD_DEV,
            gap_minutes: GAP_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventGenerator {
    config: GeneratorConfig,
}

impl EventGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn high_risk_probability(&self, baseline: i32) -> f64 {
        if baseline < self.config.risk_baseline_threshold {
            self.config.high_risk_probability_below_threshold
        } else {
            self.config.high_risk_probability_at_threshold
        }
    }

    /// Produces `count` events for one athlete, newest first. Event 0 is
    /// stamped `now`; each later event sits one random gap further back, so
    /// timestamps strictly decrease after the first.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        athlete_id: &str,
        baseline: i32,
        count: usize,
        now: DateTime<Utc>,
    ) -> Vec<JumpEvent> {
        let config = &self.config;
        let high_risk_probability = self.high_risk_probability(baseline);
        let mut events = Vec::with_capacity(count);
        let mut offset = Duration::zero();

        for index in 0..count {
            if index > 0 {
                let gap_minutes = uniform(rng, &config.gap_minutes);
                offset = offset + Duration::milliseconds((gap_minutes * 60_000.0) as i64);
            }

            let is_high = rng.random::<f64>() < high_risk_probability;
            let risk = if is_high { RiskLevel::High } else { RiskLevel::Low };
            let jitter = if config.score_jitter > 0 {
                rng.random_range(-config.score_jitter..config.score_jitter)
            } else {
                0
            };
            let score = (baseline + jitter).clamp(0, 100);

            let valgus_band = if is_high {
                &config.high_risk_valgus
            } else {
                &config.low_risk_valgus
            };
            let valgus = tenths_within(uniform(rng, valgus_band), valgus_band);

            let peak_vertical_g = hundredths(uniform(rng, &config.peak_vertical_g));
            let peak_lateral_g = hundredths(uniform(rng, &config.peak_lateral_g));
            let peak_rotational_vel = hundredths(uniform(rng, &config.peak_rotational_vel));
            let vertical_std_dev = hundredths(uniform(rng, &config.vertical_std_dev));
            let lateral_std_dev = hundredths(uniform(rng, &config.lateral_std_dev));

            let movement = MovementType::ALL[rng.random_range(0..MovementType::ALL.len())];
            let tips = if is_high { &HIGH_RISK_TIPS } else { &LOW_RISK_TIPS };
            let tip = tips[rng.random_range(0..tips.len())];

            events.push(JumpEvent {
                id: None,
                athlete_id: athlete_id.to_string(),
                timestamp: Some(now - offset),
                movement_type: Some(movement),
                risk_level: Some(risk),
                valgus_angle: Some(valgus),
                peak_vertical_g: Some(peak_vertical_g),
                peak_lateral_g: Some(peak_lateral_g),
                peak_rotational_vel: Some(peak_rotational_vel),
                vertical_std_dev: Some(vertical_std_dev),
                lateral_std_dev: Some(lateral_std_dev),
                efficiency_score: Some(score),
                tip: Some(tip.to_string()),
            });
        }

        events
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, range: &Range<f64>) -> f64 {
    rng.random::<f64>() * (range.end - range.start) + range.start
}

fn hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to one decimal. A value that rounds up to `band.end` is pulled
/// back to the last tenth inside the half-open band.
fn tenths_within(value: f64, band: &Range<f64>) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    let ceiling = ((band.end - 0.1) * 10.0).round() / 10.0;
    rounded.min(ceiling).max(band.start)
}
