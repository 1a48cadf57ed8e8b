use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::classify::{
    format_metric, metric_band, rank_medal, risk_badge, score_tier, valgus_reading, MetricBand,
    MetricKind, RiskBadge,
};
use crate::metrics::{self, page_count, summarize_by_movement, summarize_events};
use crate::models::{Athlete, JumpEvent, LeaderboardEntry, ScoutedEvent, PLACEHOLDER};
use crate::roster::{placeholder_name, DETAIL_ID_CHARS};
use crate::timestamp::{format_timestamp, time_ago_at};

fn risk_label(event: &JumpEvent) -> String {
    let level = event
        .risk_level
        .map(|r| r.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    match risk_badge(event.risk_level) {
        RiskBadge::Safe => level,
        RiskBadge::Danger => format!("**{level}**"),
    }
}

fn movement_label(event: &JumpEvent) -> &str {
    event
        .movement_type
        .as_ref()
        .map(|m| m.as_str())
        .unwrap_or(PLACEHOLDER)
}

fn banded(kind: MetricKind, value: Option<f64>, label: &str) -> String {
    match metric_band(kind, value) {
        MetricBand::Unknown => label.to_string(),
        band => format!("{label} ({band})"),
    }
}

/// One leaderboard line, shared by the report and the CLI.
pub fn leaderboard_line(entry: &LeaderboardEntry, now: DateTime<Utc>) -> String {
    format!(
        "{} {} ({}, {}, {}) score {} [{}] across {} events, valgus {}, {} high-risk, last seen {}",
        rank_medal(entry.rank),
        entry.profile.name,
        entry.profile.position_label(),
        entry.profile.club_label(),
        entry.profile.country_label(),
        entry.score,
        score_tier(Some(entry.score)),
        entry.summary.event_count,
        valgus_reading(entry.summary.avg_valgus_angle).label,
        entry.summary.high_risk_count,
        time_ago_at(&entry.summary.latest, now),
    )
}

/// One event-feed line, shared by the report and the CLI.
pub fn event_line(rank: usize, scouted: &ScoutedEvent) -> String {
    let event = &scouted.event;
    format!(
        "{} {} {} score {} risk {} valgus {} vG {} lG {} rot {} at {}",
        rank_medal(rank),
        scouted.profile.name,
        movement_label(event),
        event
            .efficiency_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        risk_label(event),
        valgus_reading(event.valgus_angle).label,
        format_metric(event.peak_vertical_g, 2),
        format_metric(event.peak_lateral_g, 2),
        format_metric(event.peak_rotational_vel, 2),
        format_timestamp(&event.timestamp),
    )
}

pub fn build_report(
    scope: Option<&str>,
    now: DateTime<Utc>,
    entries: &[LeaderboardEntry],
    events: &[ScoutedEvent],
) -> String {
    let raw_events: Vec<JumpEvent> = events.iter().map(|s| s.event.clone()).collect();
    let mix = summarize_by_movement(&raw_events);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all athletes");

    let _ = writeln!(output, "# Scouting Report");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        scope_label,
        format_timestamp(&now)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if entries.is_empty() {
        let _ = writeln!(output, "No athletes match these filters.");
    } else {
        for entry in entries.iter().take(10) {
            let _ = writeln!(output, "- {}", leaderboard_line(entry, now));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Movement Mix");

    if mix.is_empty() {
        let _ = writeln!(output, "No events recorded.");
    } else {
        for summary in mix.iter() {
            let _ = writeln!(
                output,
                "- {}: {} events (avg score {:.1})",
                summary
                    .movement_type
                    .map(|m| m.as_str())
                    .unwrap_or(PLACEHOLDER),
                summary.count,
                summary.avg_score
            );
        }
    }

    let mut recent: Vec<&ScoutedEvent> = events.iter().collect();
    recent.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Events");

    if recent.is_empty() {
        let _ = writeln!(output, "No events recorded.");
    } else {
        for scouted in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) {}: {}",
                scouted.profile.name,
                movement_label(&scouted.event),
                time_ago_at(&scouted.event.timestamp, now),
                scouted.event.tip.as_deref().unwrap_or(PLACEHOLDER)
            );
        }
    }

    output
}

/// Profile header, live averages and one page of history for one athlete.
/// `athlete` may be missing while its record has not arrived yet.
pub fn build_athlete_detail(
    athlete_id: &str,
    athlete: Option<&Athlete>,
    events: &[JumpEvent],
    page: usize,
    now: DateTime<Utc>,
) -> String {
    let mut events = events.to_vec();
    metrics::sort_newest_first(&mut events);
    let summary = summarize_events(&events);
    let tier = score_tier(Some(summary.avg_score));

    let name = athlete
        .map(|a| a.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| placeholder_name(athlete_id, DETAIL_ID_CHARS));

    let mut output = String::new();
    let _ = writeln!(output, "# {} [{}]", name, tier);

    if let Some(athlete) = athlete {
        let _ = writeln!(
            output,
            "{} | {} | {} | age {} | last active {}",
            athlete.position.map(|p| p.as_str()).unwrap_or(PLACEHOLDER),
            athlete.club.as_deref().unwrap_or(PLACEHOLDER),
            athlete.country.as_deref().unwrap_or(PLACEHOLDER),
            athlete
                .age
                .map(|age| age.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            time_ago_at(&athlete.last_active, now),
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");
    let _ = writeln!(output, "- Efficiency score: {}", summary.avg_score);
    let _ = writeln!(output, "- Events: {}", summary.event_count);
    let cards = [
        (
            MetricKind::ValgusAngle,
            summary.avg_valgus_angle,
            valgus_reading(summary.avg_valgus_angle).label,
        ),
        (
            MetricKind::PeakVerticalG,
            summary.avg_peak_vertical_g,
            format_metric(summary.avg_peak_vertical_g, 2),
        ),
        (
            MetricKind::PeakLateralG,
            summary.avg_peak_lateral_g,
            format_metric(summary.avg_peak_lateral_g, 2),
        ),
        (
            MetricKind::RotationalVelocity,
            summary.avg_peak_rotational_vel,
            format_metric(summary.avg_peak_rotational_vel, 2),
        ),
    ];
    for (kind, value, label) in cards {
        let _ = writeln!(output, "- {}: {}", kind.label(), banded(kind, value, &label));
    }
    let _ = writeln!(output, "- High-risk events: {}", summary.high_risk_count);
    let mix = metrics::risk_mix(&events);
    if mix.total() == 0 {
        let _ = writeln!(output, "- Risk split: No data");
    } else {
        let _ = writeln!(
            output,
            "- Risk split: {}% LOW ({}), {}% HIGH ({})",
            mix.low_pct, mix.low, mix.high_pct, mix.high
        );
    }
    if let Some(latest) = metrics::latest_event(&events, athlete_id) {
        let _ = writeln!(
            output,
            "- Latest: {} {} ({})",
            movement_label(latest),
            time_ago_at(&latest.timestamp, now),
            latest.tip.as_deref().unwrap_or(PLACEHOLDER)
        );
    }

    let _ = writeln!(output);
    let pages = page_count(events.len());
    let _ = writeln!(
        output,
        "## History (page {} of {})",
        page + 1,
        pages.max(1)
    );

    let rows = metrics::page(&events, page);
    if rows.is_empty() {
        let _ = writeln!(output, "No events on this page.");
    } else {
        for event in rows {
            let _ = writeln!(
                output,
                "- {} {} score {} risk {} valgus {}: {}",
                format_timestamp(&event.timestamp),
                movement_label(event),
                event
                    .efficiency_score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                risk_label(event),
                valgus_reading(event.valgus_angle).label,
                event.tip.as_deref().unwrap_or(PLACEHOLDER)
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::leaderboard;
    use crate::models::{MovementType, Position, RiskLevel};
    use crate::roster::AthleteIndex;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn athlete() -> Athlete {
        Athlete {
            id: "player-004".to_string(),
            name: "Emma Chen".to_string(),
            age: Some(14),
            position: Some(Position::Midfielder),
            club: Some("Beijing Sports School".to_string()),
            country: Some("China".to_string()),
            last_active: Some(now() - Duration::minutes(20)),
            ..Default::default()
        }
    }

    fn event(minutes_ago: i64, risk: RiskLevel, valgus: f64) -> JumpEvent {
        JumpEvent {
            athlete_id: "player-004".to_string(),
            timestamp: Some(now() - Duration::minutes(minutes_ago)),
            movement_type: Some(MovementType::Landing),
            risk_level: Some(risk),
            valgus_angle: Some(valgus),
            peak_vertical_g: Some(3.5),
            efficiency_score: Some(90),
            tip: Some("Solid deceleration.".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn report_lists_leaderboard_and_recent_events() {
        let index = AthleteIndex::new(vec![athlete()]);
        let events = vec![event(5, RiskLevel::Low, 6.0), event(90, RiskLevel::High, 16.0)];
        let entries = leaderboard(&index, &events);
        let scouted = index.enrich_all(events);

        let report = build_report(Some("India"), now(), &entries, &scouted);

        assert!(report.starts_with("# Scouting Report"));
        assert!(report.contains("Generated for India at 14 Mar 2026, 12:00"));
        assert!(report.contains("🥇 Emma Chen (Midfielder, Beijing Sports School, China) score 90 [Elite]"));
        assert!(report.contains("valgus 11.0°"));
        assert!(report.contains("- LANDING: 2 events (avg score 90.0)"));
        assert!(report.contains("- Emma Chen (LANDING) 5m ago: Solid deceleration."));
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report(None, now(), &[], &[]);
        assert!(report.contains("Generated for all athletes"));
        assert!(report.contains("No athletes match these filters."));
        assert!(report.contains("No events recorded."));
    }

    #[test]
    fn detail_tolerates_missing_athlete_record() {
        let events = vec![event(5, RiskLevel::High, 18.3)];
        let detail = build_athlete_detail("player-004", None, &events, 0, now());

        assert!(detail.starts_with("# Athlete player-0 [Elite]"));
        assert!(detail.contains("- Avg valgus: 18.3° (danger)"));
        assert!(detail.contains("- Avg vertical G: 3.50 (good)"));
        assert!(detail.contains("- Avg lateral G: —\n"));
        assert!(detail.contains("- Risk split: 0% LOW (0), 100% HIGH (1)"));
        assert!(detail.contains("risk **HIGH**"));
        assert!(detail.contains("- Latest: LANDING 5m ago (Solid deceleration.)"));
        assert!(detail.contains("## History (page 1 of 1)"));
    }

    #[test]
    fn detail_shows_profile_when_present() {
        let athlete = athlete();
        let detail = build_athlete_detail(&athlete.id, Some(&athlete), &[], 0, now());
        assert!(detail.contains("Midfielder | Beijing Sports School | China | age 14 | last active 20m ago"));
        assert!(detail.contains("- Avg valgus: —\n"));
        assert!(detail.contains("- Risk split: No data"));
        assert!(detail.contains("No events on this page."));
    }

    #[test]
    fn event_lines_use_placeholders() {
        let scouted = ScoutedEvent {
            event: JumpEvent {
                athlete_id: "ghost".to_string(),
                ..Default::default()
            },
            profile: AthleteIndex::default().profile("ghost", 6),
        };
        let line = event_line(4, &scouted);
        assert_eq!(
            line,
            "#4 Athlete ghost — score — risk **—** valgus — vG — lG — rot — at —"
        );
    }
}
