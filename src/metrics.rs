use std::cmp::Ordering;
use std::collections::HashMap;

use crate::classify::resolve_score;
use crate::filters::{matches, FilterSpec};
use crate::models::{
    EventSummary, JumpEvent, LeaderboardEntry, MovementSummary, MovementType, RiskLevel,
    RiskMix,
};
use crate::roster::{AthleteIndex, DETAIL_ID_CHARS};

/// Rows per page on the athlete detail view.
pub const PAGE_SIZE: usize = 15;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|value| value.is_finite())
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Aggregates recomputed from an athlete's events. Missing metrics are left
/// out of their average rather than counted as zero.
pub fn summarize_events(events: &[JumpEvent]) -> EventSummary {
    if events.is_empty() {
        return EventSummary::default();
    }

    let avg_score = mean(
        events
            .iter()
            .filter_map(|e| e.efficiency_score)
            .map(f64::from),
    )
    .map(|avg| avg.round() as i32)
    .unwrap_or(0);

    EventSummary {
        event_count: events.len(),
        avg_score,
        avg_valgus_angle: mean(events.iter().filter_map(|e| e.valgus_angle)),
        avg_peak_vertical_g: mean(events.iter().filter_map(|e| e.peak_vertical_g)),
        avg_peak_lateral_g: mean(events.iter().filter_map(|e| e.peak_lateral_g)),
        avg_peak_rotational_vel: mean(events.iter().filter_map(|e| e.peak_rotational_vel)),
        high_risk_count: events
            .iter()
            .filter(|e| e.risk_level == Some(RiskLevel::High))
            .count(),
        latest: events.iter().filter_map(|e| e.timestamp).max(),
    }
}

/// Newest first; events without a readable timestamp sink to the end.
pub fn sort_newest_first(events: &mut [JumpEvent]) {
    events.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn latest_event<'a>(events: &'a [JumpEvent], athlete_id: &str) -> Option<&'a JumpEvent> {
    events
        .iter()
        .filter(|e| e.athlete_id == athlete_id && e.timestamp.is_some())
        .max_by_key(|e| e.timestamp)
}

pub fn page<T>(rows: &[T], page: usize) -> &[T] {
    let start = page.saturating_mul(PAGE_SIZE).min(rows.len());
    let end = start.saturating_add(PAGE_SIZE).min(rows.len());
    &rows[start..end]
}

pub fn page_count(rows: usize) -> usize {
    rows.div_ceil(PAGE_SIZE)
}

/// Ranks athletes by score. The average over an athlete's events wins;
/// athletes with no events fall back to their stored score. Athletes seen
/// only through their events are ranked with a placeholder profile.
pub fn leaderboard(index: &AthleteIndex, events: &[JumpEvent]) -> Vec<LeaderboardEntry> {
    let mut grouped: HashMap<&str, Vec<JumpEvent>> = HashMap::new();
    for event in events {
        grouped
            .entry(event.athlete_id.as_str())
            .or_default()
            .push(event.clone());
    }

    let mut entries: Vec<LeaderboardEntry> = Vec::new();

    for athlete in index.athletes() {
        let athlete_events = grouped.remove(athlete.id.as_str()).unwrap_or_default();
        let summary = summarize_events(&athlete_events);
        let score = if summary.event_count > 0 {
            summary.avg_score
        } else {
            resolve_score(athlete)
        };
        entries.push(LeaderboardEntry {
            rank: 0,
            athlete_id: athlete.id.clone(),
            profile: index.profile(&athlete.id, DETAIL_ID_CHARS),
            score,
            summary,
        });
    }

    for (athlete_id, athlete_events) in grouped {
        let summary = summarize_events(&athlete_events);
        entries.push(LeaderboardEntry {
            rank: 0,
            athlete_id: athlete_id.to_string(),
            profile: index.profile(athlete_id, DETAIL_ID_CHARS),
            score: summary.avg_score,
            summary,
        });
    }

    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.profile.name.cmp(&b.profile.name))
            .then_with(|| a.athlete_id.cmp(&b.athlete_id))
    });
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position + 1;
    }
    entries
}

/// Leaderboard over the events that pass `spec`. With an open spec every
/// athlete is ranked; otherwise only athletes with a matching event are.
pub fn filtered_leaderboard(
    index: &AthleteIndex,
    events: &[JumpEvent],
    spec: &FilterSpec,
) -> Vec<LeaderboardEntry> {
    if !spec.is_active() {
        return leaderboard(index, events);
    }

    let matched: Vec<JumpEvent> = index
        .enrich_all(events.iter().cloned())
        .into_iter()
        .filter(|scouted| matches(scouted, spec))
        .map(|scouted| scouted.event)
        .collect();
    let athletes = index
        .athletes()
        .filter(|athlete| matched.iter().any(|event| event.athlete_id == athlete.id))
        .cloned();

    leaderboard(&AthleteIndex::new(athletes), &matched)
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64 * 100.0).round() as u32
    }
}

/// Counts and rounded shares of LOW and HIGH events. Both shares are
/// rounded independently, so they need not add up to 100.
pub fn risk_mix(events: &[JumpEvent]) -> RiskMix {
    let high = events
        .iter()
        .filter(|e| e.risk_level == Some(RiskLevel::High))
        .count();
    let low = events
        .iter()
        .filter(|e| e.risk_level == Some(RiskLevel::Low))
        .count();
    let total = low + high;
    RiskMix {
        low,
        high,
        low_pct: percent(low, total),
        high_pct: percent(high, total),
    }
}

/// Event count and mean score per movement type, most frequent first.
pub fn summarize_by_movement(events: &[JumpEvent]) -> Vec<MovementSummary> {
    let mut map: HashMap<Option<MovementType>, (usize, i64, usize)> = HashMap::new();

    for event in events {
        let entry = map.entry(event.movement_type).or_insert((0, 0, 0));
        entry.0 += 1;
        if let Some(score) = event.efficiency_score {
            entry.1 += i64::from(score);
            entry.2 += 1;
        }
    }

    let mut summaries: Vec<MovementSummary> = map
        .into_iter()
        .map(|(movement_type, (count, total_score, scored))| MovementSummary {
            movement_type,
            count,
            avg_score: if scored == 0 {
                0.0
            } else {
                total_score as f64 / scored as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.movement_type.cmp(&b.movement_type))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Athlete;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn event(athlete_id: &str, minutes_ago: i64, score: i32, valgus: Option<f64>) -> JumpEvent {
        JumpEvent {
            athlete_id: athlete_id.to_string(),
            timestamp: Some(now() - Duration::minutes(minutes_ago)),
            movement_type: Some(MovementType::Landing),
            risk_level: Some(if valgus.unwrap_or(0.0) >= 12.0 {
                RiskLevel::High
            } else {
                RiskLevel::Low
            }),
            valgus_angle: valgus,
            efficiency_score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn averages_skip_missing_metrics() {
        let events = vec![
            event("a", 1, 80, Some(8.0)),
            event("a", 2, 71, None),
            event("a", 3, 70, Some(14.0)),
        ];
        let summary = summarize_events(&events);

        assert_eq!(summary.event_count, 3);
        assert_eq!(summary.avg_score, 74);
        assert_eq!(summary.avg_valgus_angle, Some(11.0));
        assert_eq!(summary.avg_peak_vertical_g, None);
        assert_eq!(summary.high_risk_count, 1);
        assert_eq!(summary.latest, Some(now() - Duration::minutes(1)));
    }

    #[test]
    fn empty_history_summarizes_to_zero() {
        let summary = summarize_events(&[]);
        assert_eq!(summary.avg_score, 0);
        assert_eq!(summary.event_count, 0);
        assert_eq!(summary.latest, None);
    }

    #[test]
    fn newest_first_with_undated_last() {
        let mut events = vec![
            event("a", 30, 70, None),
            JumpEvent {
                athlete_id: "a".to_string(),
                ..Default::default()
            },
            event("a", 5, 70, None),
        ];
        sort_newest_first(&mut events);
        assert_eq!(events[0].timestamp, Some(now() - Duration::minutes(5)));
        assert_eq!(events[1].timestamp, Some(now() - Duration::minutes(30)));
        assert_eq!(events[2].timestamp, None);
    }

    #[test]
    fn latest_event_is_per_athlete() {
        let events = vec![
            event("a", 30, 70, None),
            event("b", 1, 70, None),
            event("a", 10, 71, None),
        ];
        let latest = latest_event(&events, "a").unwrap();
        assert_eq!(latest.efficiency_score, Some(71));
        assert!(latest_event(&events, "c").is_none());
    }

    #[test]
    fn leaderboard_prefers_event_averages() {
        let index = AthleteIndex::new(vec![
            Athlete {
                id: "a".to_string(),
                name: "Stored High".to_string(),
                avg_efficiency_score: Some(99),
                ..Default::default()
            },
            Athlete {
                id: "b".to_string(),
                name: "No Events".to_string(),
                efficiency_score: Some(75),
                ..Default::default()
            },
        ]);
        let events = vec![
            event("a", 1, 60, None),
            event("a", 2, 62, None),
            event("orphan-123456789", 3, 90, None),
        ];

        let board = leaderboard(&index, &events);
        let order: Vec<(&str, i32, usize)> = board
            .iter()
            .map(|e| (e.athlete_id.as_str(), e.score, e.rank))
            .collect();
        assert_eq!(
            order,
            vec![("orphan-123456789", 90, 1), ("b", 75, 2), ("a", 61, 3)]
        );
        assert_eq!(board[0].profile.name, "Athlete orphan-1");
        assert!(!board[0].profile.known);
    }

    #[test]
    fn filtered_leaderboard_ranks_only_matching_events() {
        let index = AthleteIndex::new(vec![
            Athlete {
                id: "a".to_string(),
                name: "Alpha".to_string(),
                country: Some("India".to_string()),
                ..Default::default()
            },
            Athlete {
                id: "b".to_string(),
                name: "Bravo".to_string(),
                country: Some("Spain".to_string()),
                efficiency_score: Some(88),
                ..Default::default()
            },
        ]);
        let events = vec![
            event("a", 1, 90, Some(14.0)),
            event("a", 2, 50, Some(5.0)),
            event("b", 3, 70, Some(6.0)),
        ];

        let open = filtered_leaderboard(&index, &events, &FilterSpec::default());
        assert_eq!(open.len(), 2);

        let high_risk = FilterSpec {
            risk_level: Some(RiskLevel::High),
            ..Default::default()
        };
        let board = filtered_leaderboard(&index, &events, &high_risk);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].athlete_id, "a");
        assert_eq!(board[0].score, 90);
        assert_eq!(board[0].summary.event_count, 1);
    }

    #[test]
    fn pagination() {
        let rows: Vec<usize> = (0..32).collect();
        assert_eq!(page_count(rows.len()), 3);
        assert_eq!(page(&rows, 0).len(), 15);
        assert_eq!(page(&rows, 2), &[30, 31]);
        assert!(page(&rows, 9).is_empty());
    }

    #[test]
    fn risk_mix_rounds_each_share() {
        let mut events = vec![
            event("a", 1, 70, Some(13.0)),
            event("a", 2, 70, Some(5.0)),
            event("a", 3, 70, Some(6.0)),
            JumpEvent {
                athlete_id: "a".to_string(),
                ..Default::default()
            },
        ];
        let mix = risk_mix(&events);
        assert_eq!((mix.low, mix.high, mix.total()), (2, 1, 3));
        assert_eq!((mix.low_pct, mix.high_pct), (67, 33));

        events.push(event("a", 4, 70, Some(14.0)));
        let mix = risk_mix(&events);
        assert_eq!((mix.low_pct, mix.high_pct), (50, 50));
    }

    #[test]
    fn risk_mix_of_nothing_is_zero() {
        assert_eq!(risk_mix(&[]), RiskMix::default());
    }

    #[test]
    fn movement_mix_counts_and_averages() {
        let mut cutting = event("a", 1, 90, None);
        cutting.movement_type = Some(MovementType::Cutting);
        let events = vec![event("a", 2, 70, None), event("a", 3, 80, None), cutting];

        let mix = summarize_by_movement(&events);
        assert_eq!(mix[0].movement_type, Some(MovementType::Landing));
        assert_eq!(mix[0].count, 2);
        assert!((mix[0].avg_score - 75.0).abs() < 0.001);
        assert_eq!(mix[1].movement_type, Some(MovementType::Cutting));
    }
}
