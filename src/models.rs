use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ModelError;
use crate::timestamp;

/// Display value for any field that is missing or unreadable.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Forward,
    Midfielder,
    Defender,
    Goalkeeper,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Forward,
        Position::Midfielder,
        Position::Defender,
        Position::Goalkeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Forward => "Forward",
            Position::Midfielder => "Midfielder",
            Position::Defender => "Defender",
            Position::Goalkeeper => "Goalkeeper",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|position| position.as_str() == s)
            .ok_or_else(|| ModelError::UnknownPosition(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Cutting,
    Landing,
    Unknown,
}

impl MovementType {
    pub const ALL: [MovementType; 3] = [
        MovementType::Cutting,
        MovementType::Landing,
        MovementType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Cutting => "CUTTING",
            MovementType::Landing => "LANDING",
            MovementType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|movement| movement.as_str() == s)
            .ok_or_else(|| ModelError::UnknownMovementType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(ModelError::UnknownRiskLevel(other.to_string())),
        }
    }
}

/// A scouted individual as stored in the `athletes` collection.
///
/// The stored aggregate fields are whatever the producer last wrote; they
/// are not kept in step with the athlete's events. See
/// [`crate::metrics::summarize_events`] for the authoritative figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub avg_efficiency_score: Option<i32>,
    /// Legacy single-value score written by older producers.
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub efficiency_score: Option<i32>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub total_jumps: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub avg_valgus_angle: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub avg_peak_vertical_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub avg_peak_lateral_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub avg_rotational_vel: Option<f64>,
}

/// One jump/cut observation from the `jumpLogs` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpEvent {
    /// Assigned by the store; absent on freshly generated events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub athlete_id: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub movement_type: Option<MovementType>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub valgus_angle: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub peak_vertical_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub peak_lateral_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub peak_rotational_vel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub vertical_std_dev: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub lateral_std_dev: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub efficiency_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Profile fields an event borrows from its athlete for display and
/// filtering. `known` is false when the athlete record has not arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteProfile {
    pub name: String,
    pub position: Option<Position>,
    pub club: Option<String>,
    pub country: Option<String>,
    pub age: Option<u32>,
    pub known: bool,
}

impl AthleteProfile {
    pub fn position_label(&self) -> &str {
        self.position.map(|p| p.as_str()).unwrap_or(PLACEHOLDER)
    }

    pub fn club_label(&self) -> &str {
        self.club.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn country_label(&self) -> &str {
        self.country.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn age_label(&self) -> String {
        self.age
            .map(|age| age.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoutedEvent {
    pub event: JumpEvent,
    pub profile: AthleteProfile,
}

/// Live aggregates recomputed from an athlete's events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventSummary {
    pub event_count: usize,
    pub avg_score: i32,
    pub avg_valgus_angle: Option<f64>,
    pub avg_peak_vertical_g: Option<f64>,
    pub avg_peak_lateral_g: Option<f64>,
    pub avg_peak_rotational_vel: Option<f64>,
    pub high_risk_count: usize,
    pub latest: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub athlete_id: String,
    pub profile: AthleteProfile,
    pub score: i32,
    pub summary: EventSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementSummary {
    pub movement_type: Option<MovementType>,
    pub count: usize,
    pub avg_score: f64,
}

/// LOW/HIGH split of an event history. Events without a recognized risk
/// level are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMix {
    pub low: usize,
    pub high: usize,
    pub low_pct: u32,
    pub high_pct: u32,
}

impl RiskMix {
    pub fn total(&self) -> usize {
        self.low + self.high
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(serde::de::IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Value(value)) => Some(value),
        Some(Lenient::Other(_)) | None => None,
    })
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(lenient::<D, String>(deserializer)?.and_then(|raw| raw.parse().ok()))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, f64>(deserializer)?.filter(|value| value.is_finite()))
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|value| value.round().clamp(0.0, 100.0) as i32))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|value| *value >= 0.0)
        .map(|value| value as i64))
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|value| *value > 0.0 && value.fract() == 0.0)
        .map(|value| value as u32))
}
