use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::generator::{EventGenerator, SEED_BATCH};
use crate::models::{Athlete, JumpEvent, Position};
use crate::snapshot::SnapshotSource;
use crate::timestamp::parse_instant;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Demonstration roster written by `seed`.
pub fn seed_roster() -> Vec<Athlete> {
    #[allow(clippy::type_complexity)]
    let rows: [(&str, &str, u32, Position, &str, &str, i32, i64, f64, f64, f64, f64); 10] = [
        ("demo-user-001", "Rahul Sharma", 16, Position::Midfielder, "United Youth Academy", "India", 87, 42, 8.4, 4.2, 2.1, 2.3),
        ("player-002", "Arjun Mehta", 15, Position::Forward, "Mumbai FC Youth", "India", 92, 38, 6.2, 4.8, 1.9, 2.1),
        ("player-003", "Lucas Silva", 17, Position::Defender, "São Paulo Academy", "Brazil", 74, 55, 12.1, 3.9, 2.4, 2.7),
        ("player-004", "Emma Chen", 14, Position::Midfielder, "Beijing Sports School", "China", 95, 67, 5.8, 3.7, 1.7, 1.9),
        ("player-005", "Carlos Mendez", 18, Position::Forward, "Barcelona B", "Spain", 81, 91, 9.3, 5.1, 2.3, 2.5),
        ("player-006", "Ahmed Al-Rashid", 16, Position::Goalkeeper, "Dubai Sports City", "UAE", 68, 29, 14.2, 3.2, 1.5, 1.8),
        ("player-007", "Priya Nair", 15, Position::Defender, "Kerala Blasters Youth", "India", 79, 48, 10.7, 3.8, 2.0, 2.2),
        ("player-008", "Kenji Tanaka", 17, Position::Midfielder, "Gamba Osaka Youth", "Japan", 88, 73, 7.9, 4.4, 2.2, 2.4),
        ("player-009", "Fatima Ouedraogo", 16, Position::Forward, "ASEC Mimosas", "Ghana", 55, 22, 17.3, 5.4, 2.9, 3.1),
        ("player-010", "Marcus Johnson", 14, Position::Midfielder, "Manchester City EDS", "England", 91, 58, 6.5, 4.0, 1.8, 2.0),
    ];

    rows.into_iter()
        .map(
            |(id, name, age, position, club, country, score, jumps, valgus, vertical, lateral, rotational)| {
                Athlete {
                    id: id.to_string(),
                    name: name.to_string(),
                    age: Some(age),
                    position: Some(position),
                    club: Some(club.to_string()),
                    country: Some(country.to_string()),
                    last_active: None,
                    avg_efficiency_score: None,
                    efficiency_score: Some(score),
                    total_jumps: Some(jumps),
                    avg_valgus_angle: Some(valgus),
                    avg_peak_vertical_g: Some(vertical),
                    avg_peak_lateral_g: Some(lateral),
                    avg_rotational_vel: Some(rotational),
                }
            },
        )
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub athletes: usize,
    pub events: usize,
}

pub async fn seed<R: Rng + ?Sized>(
    pool: &PgPool,
    rng: &mut R,
    generator: &EventGenerator,
    now: DateTime<Utc>,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let roster = seed_roster();

    let mut tx = pool.begin().await?;
    for athlete in &roster {
        let mut athlete = athlete.clone();
        athlete.last_active = Some(now - Duration::minutes(rng.random_range(10..300)));
        upsert_athlete(&mut *tx, &athlete).await?;
        tracing::info!(athlete_id = %athlete.id, name = %athlete.name, "athlete seeded");
        summary.athletes += 1;
    }
    tx.commit().await?;

    for athlete in &roster {
        let baseline = athlete.efficiency_score.unwrap_or(0);
        let count = rng.random_range(SEED_BATCH);
        let events = generator.generate(rng, &athlete.id, baseline, count, now);

        let mut tx = pool.begin().await?;
        for event in &events {
            insert_event(&mut *tx, event, None).await?;
        }
        tx.commit().await?;

        tracing::info!(athlete_id = %athlete.id, events = events.len(), "events seeded");
        summary.events += events.len();
    }

    Ok(summary)
}

pub async fn upsert_athlete<'e, E>(executor: E, athlete: &Athlete) -> anyhow::Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO scout_telemetry.athletes
        (id, name, age, position, club, country, last_active, avg_efficiency_score,
         efficiency_score, total_jumps, avg_valgus_angle, avg_peak_vertical_g,
         avg_peak_lateral_g, avg_rotational_vel)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            age = EXCLUDED.age,
            position = EXCLUDED.position,
            club = EXCLUDED.club,
            country = EXCLUDED.country,
            last_active = EXCLUDED.last_active,
            avg_efficiency_score = EXCLUDED.avg_efficiency_score,
            efficiency_score = EXCLUDED.efficiency_score,
            total_jumps = EXCLUDED.total_jumps,
            avg_valgus_angle = EXCLUDED.avg_valgus_angle,
            avg_peak_vertical_g = EXCLUDED.avg_peak_vertical_g,
            avg_peak_lateral_g = EXCLUDED.avg_peak_lateral_g,
            avg_rotational_vel = EXCLUDED.avg_rotational_vel
        "#,
    )
    .bind(&athlete.id)
    .bind(&athlete.name)
    .bind(athlete.age.map(|age| age as i32))
    .bind(athlete.position.map(|p| p.as_str()))
    .bind(&athlete.club)
    .bind(&athlete.country)
    .bind(athlete.last_active)
    .bind(athlete.avg_efficiency_score)
    .bind(athlete.efficiency_score)
    .bind(athlete.total_jumps)
    .bind(athlete.avg_valgus_angle)
    .bind(athlete.avg_peak_vertical_g)
    .bind(athlete.avg_peak_lateral_g)
    .bind(athlete.avg_rotational_vel)
    .execute(executor)
    .await
    .with_context(|| format!("failed to upsert athlete {}", athlete.id))?;

    Ok(())
}

/// Appends one event. Returns false when `source_key` was already imported.
pub async fn insert_event<'e, E>(
    executor: E,
    event: &JumpEvent,
    source_key: Option<&str>,
) -> anyhow::Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO scout_telemetry.jump_logs
        (id, athlete_id, occurred_at, movement_type, risk_level, valgus_angle,
         peak_vertical_g, peak_lateral_g, peak_rotational_vel, vertical_std_dev,
         lateral_std_dev, efficiency_score, tip, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&event.athlete_id)
    .bind(event.timestamp)
    .bind(event.movement_type.map(|m| m.as_str()))
    .bind(event.risk_level.map(|r| r.as_str()))
    .bind(event.valgus_angle)
    .bind(event.peak_vertical_g)
    .bind(event.peak_lateral_g)
    .bind(event.peak_rotational_vel)
    .bind(event.vertical_std_dev)
    .bind(event.lateral_std_dev)
    .bind(event.efficiency_score)
    .bind(&event.tip)
    .bind(source_key)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

const ATHLETE_COLUMNS: &str = "id, name, age, position, club, country, last_active, \
     avg_efficiency_score, efficiency_score, total_jumps, avg_valgus_angle, \
     avg_peak_vertical_g, avg_peak_lateral_g, avg_rotational_vel";

const EVENT_COLUMNS: &str = "id, athlete_id, occurred_at, movement_type, risk_level, \
     valgus_angle, peak_vertical_g, peak_lateral_g, peak_rotational_vel, \
     vertical_std_dev, lateral_std_dev, efficiency_score, tip";

pub async fn fetch_athletes(pool: &PgPool) -> anyhow::Result<Vec<Athlete>> {
    let query = format!("SELECT {ATHLETE_COLUMNS} FROM scout_telemetry.athletes ORDER BY name");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(athlete_from_row).collect())
}

pub async fn fetch_athlete(pool: &PgPool, athlete_id: &str) -> anyhow::Result<Option<Athlete>> {
    let query = format!("SELECT {ATHLETE_COLUMNS} FROM scout_telemetry.athletes WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(athlete_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(athlete_from_row))
}

/// Most recent events, optionally for one athlete.
pub async fn fetch_events(
    pool: &PgPool,
    athlete_id: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<JumpEvent>> {
    let mut query = format!("SELECT {EVENT_COLUMNS} FROM scout_telemetry.jump_logs");
    if athlete_id.is_some() {
        query.push_str(" WHERE athlete_id = $2");
    }
    query.push_str(" ORDER BY occurred_at DESC NULLS LAST LIMIT $1");

    let mut rows = sqlx::query(&query).bind(limit);
    if let Some(value) = athlete_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(event_from_row).collect())
}

fn stored<T: FromStr>(column: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(column, value = %raw, "ignoring unrecognized stored value");
            None
        }
    }
}

fn athlete_from_row(row: &PgRow) -> Athlete {
    Athlete {
        id: row.get("id"),
        name: row.get("name"),
        age: row
            .get::<Option<i32>, _>("age")
            .and_then(|age| u32::try_from(age).ok()),
        position: stored("position", row.get("position")),
        club: row.get("club"),
        country: row.get("country"),
        last_active: row.get("last_active"),
        avg_efficiency_score: row.get("avg_efficiency_score"),
        efficiency_score: row.get("efficiency_score"),
        total_jumps: row.get("total_jumps"),
        avg_valgus_angle: row.get("avg_valgus_angle"),
        avg_peak_vertical_g: row.get("avg_peak_vertical_g"),
        avg_peak_lateral_g: row.get("avg_peak_lateral_g"),
        avg_rotational_vel: row.get("avg_rotational_vel"),
    }
}

fn event_from_row(row: &PgRow) -> JumpEvent {
    JumpEvent {
        id: Some(row.get::<Uuid, _>("id").to_string()),
        athlete_id: row.get("athlete_id"),
        timestamp: row.get("occurred_at"),
        movement_type: stored("movement_type", row.get("movement_type")),
        risk_level: stored("risk_level", row.get("risk_level")),
        valgus_angle: row.get("valgus_angle"),
        peak_vertical_g: row.get("peak_vertical_g"),
        peak_lateral_g: row.get("peak_lateral_g"),
        peak_rotational_vel: row.get("peak_rotational_vel"),
        vertical_std_dev: row.get("vertical_std_dev"),
        lateral_std_dev: row.get("lateral_std_dev"),
        efficiency_score: row.get("efficiency_score"),
        tip: row.get("tip"),
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    athlete_id: String,
    timestamp: Option<String>,
    movement_type: Option<String>,
    risk_level: Option<String>,
    valgus_angle: Option<f64>,
    peak_vertical_g: Option<f64>,
    peak_lateral_g: Option<f64>,
    peak_rotational_vel: Option<f64>,
    vertical_std_dev: Option<f64>,
    lateral_std_dev: Option<f64>,
    efficiency_score: Option<i32>,
    tip: Option<String>,
    source_key: Option<String>,
}

impl CsvRow {
    fn into_event(self) -> (JumpEvent, String) {
        let source_key = self
            .source_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let event = JumpEvent {
            id: None,
            athlete_id: self.athlete_id,
            timestamp: self.timestamp.as_deref().and_then(parse_instant),
            movement_type: stored("movement_type", self.movement_type),
            risk_level: stored("risk_level", self.risk_level),
            valgus_angle: self.valgus_angle,
            peak_vertical_g: self.peak_vertical_g,
            peak_lateral_g: self.peak_lateral_g,
            peak_rotational_vel: self.peak_rotational_vel,
            vertical_std_dev: self.vertical_std_dev,
            lateral_std_dev: self.lateral_std_dev,
            efficiency_score: self.efficiency_score.map(|score| score.clamp(0, 100)),
            tip: self.tip.filter(|tip| !tip.is_empty()),
        };
        (event, source_key)
    }
}

fn read_csv_events<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<(JumpEvent, String)>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut events = Vec::new();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", line + 1))?;
        events.push(row.into_event());
    }
    Ok(events)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let events = read_csv_events(file)?;
    let mut inserted = 0usize;

    for (event, source_key) in &events {
        if insert_event(pool, event, Some(source_key)).await? {
            inserted += 1;
        } else {
            tracing::debug!(source_key = %source_key, "event already imported");
        }
    }

    Ok(inserted)
}

/// Athlete collection as a snapshot source.
#[derive(Debug, Clone)]
pub struct AthleteSource {
    pub pool: PgPool,
}

impl SnapshotSource for AthleteSource {
    type Record = Athlete;

    async fn fetch(&self) -> anyhow::Result<Vec<Athlete>> {
        fetch_athletes(&self.pool).await
    }
}

/// Newest events, optionally narrowed to one athlete, as a snapshot source.
#[derive(Debug, Clone)]
pub struct EventSource {
    pub pool: PgPool,
    pub athlete_id: Option<String>,
    pub limit: i64,
}

impl SnapshotSource for EventSource {
    type Record = JumpEvent;

    async fn fetch(&self) -> anyhow::Result<Vec<JumpEvent>> {
        fetch_events(&self.pool, self.athlete_id.as_deref(), self.limit).await
    }
}
