//! Client-side filtering of athlete and event snapshots.
//!
//! Every constraint in a [`FilterSpec`] is optional and they combine with a
//! logical AND. A record that lacks a field never satisfies an active
//! constraint on that field.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::classify::{age_bracket, resolve_score, AgeBracket};
use crate::models::{
    Athlete, LeaderboardEntry, MovementType, Position, RiskLevel, ScoutedEvent,
};

/// Sentinel accepted wherever a constraint can be left open.
pub const ALL: &str = "All";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub position: Option<Position>,
    pub country: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub movement_type: Option<MovementType>,
    pub age_group: Option<AgeBracket>,
    /// Scores below this are dropped; 0 or less leaves scores unconstrained.
    pub min_score: i32,
    pub search: String,
}

impl FilterSpec {
    pub fn is_active(&self) -> bool {
        self.position.is_some()
            || self.country.is_some()
            || self.risk_level.is_some()
            || self.movement_type.is_some()
            || self.age_group.is_some()
            || self.min_score > 0
            || !self.search.is_empty()
    }
}

/// Parses a filter choice, mapping the `All` sentinel (or nothing) to an
/// open constraint.
pub fn parse_choice<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, T::Err> {
    match raw {
        None | Some("") | Some(ALL) => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

/// Field access the filter engine needs from a record.
pub trait Filterable {
    fn position(&self) -> Option<Position>;
    fn country(&self) -> Option<&str>;
    fn age(&self) -> Option<u32>;
    fn score(&self) -> i32;
    fn name(&self) -> Option<&str>;
    fn club(&self) -> Option<&str>;

    fn risk_level(&self) -> Option<RiskLevel> {
        None
    }

    fn movement_type(&self) -> Option<MovementType> {
        None
    }

    fn search_fields(&self) -> [Option<&str>; 5] {
        [
            self.name(),
            self.club(),
            self.country(),
            self.position().map(|p| p.as_str()),
            self.movement_type().map(|m| m.as_str()),
        ]
    }
}

impl Filterable for Athlete {
    fn position(&self) -> Option<Position> {
        self.position
    }

    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    fn age(&self) -> Option<u32> {
        self.age
    }

    fn score(&self) -> i32 {
        resolve_score(self)
    }

    fn name(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|name| !name.is_empty())
    }

    fn club(&self) -> Option<&str> {
        self.club.as_deref()
    }
}

impl Filterable for ScoutedEvent {
    fn position(&self) -> Option<Position> {
        self.profile.position
    }

    fn country(&self) -> Option<&str> {
        self.profile.country.as_deref()
    }

    fn age(&self) -> Option<u32> {
        self.profile.age
    }

    fn score(&self) -> i32 {
        self.event.efficiency_score.unwrap_or(0)
    }

    fn name(&self) -> Option<&str> {
        Some(self.profile.name.as_str())
    }

    fn club(&self) -> Option<&str> {
        self.profile.club.as_deref()
    }

    fn risk_level(&self) -> Option<RiskLevel> {
        self.event.risk_level
    }

    fn movement_type(&self) -> Option<MovementType> {
        self.event.movement_type
    }
}

impl Filterable for LeaderboardEntry {
    fn position(&self) -> Option<Position> {
        self.profile.position
    }

    fn country(&self) -> Option<&str> {
        self.profile.country.as_deref()
    }

    fn age(&self) -> Option<u32> {
        self.profile.age
    }

    fn score(&self) -> i32 {
        self.score
    }

    fn name(&self) -> Option<&str> {
        Some(self.profile.name.as_str())
    }

    fn club(&self) -> Option<&str> {
        self.profile.club.as_deref()
    }
}

fn exact<T: PartialEq>(wanted: Option<&T>, actual: Option<&T>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual == Some(wanted),
    }
}

pub fn matches<T: Filterable + ?Sized>(record: &T, spec: &FilterSpec) -> bool {
    if !exact(spec.position.as_ref(), record.position().as_ref()) {
        return false;
    }
    if let Some(country) = spec.country.as_deref() {
        if record.country() != Some(country) {
            return false;
        }
    }
    if !exact(spec.risk_level.as_ref(), record.risk_level().as_ref()) {
        return false;
    }
    if !exact(spec.movement_type.as_ref(), record.movement_type().as_ref()) {
        return false;
    }
    if spec.min_score > 0 && record.score() < spec.min_score {
        return false;
    }
    if let Some(group) = spec.age_group {
        if record.age().map(age_bracket) != Some(group) {
            return false;
        }
    }
    if !spec.search.is_empty() {
        let query = spec.search.to_lowercase();
        let hit = record
            .search_fields()
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query));
        if !hit {
            return false;
        }
    }
    true
}

/// Order-preserving subset of `records` matching every constraint in `spec`.
pub fn apply_filters<T: Filterable + Clone>(records: &[T], spec: &FilterSpec) -> Vec<T> {
    records
        .iter()
        .filter(|record| matches(*record, spec))
        .cloned()
        .collect()
}

/// Choices offered for each constraint, each led by the `All` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub positions: Vec<String>,
    pub countries: Vec<String>,
    pub movement_types: Vec<String>,
    pub risk_levels: Vec<String>,
}

pub fn filter_options<T: Filterable>(records: &[T]) -> FilterOptions {
    let mut positions = vec![ALL.to_string()];
    let mut movement_types = vec![ALL.to_string()];
    let mut countries = BTreeSet::new();

    for record in records {
        if let Some(position) = record.position() {
            if !positions.iter().any(|seen| seen == position.as_str()) {
                positions.push(position.to_string());
            }
        }
        if let Some(movement) = record.movement_type() {
            if !movement_types.iter().any(|seen| seen == movement.as_str()) {
                movement_types.push(movement.to_string());
            }
        }
        if let Some(country) = record.country().filter(|country| !country.is_empty()) {
            countries.insert(country.to_string());
        }
    }

    FilterOptions {
        positions,
        countries: std::iter::once(ALL.to_string()).chain(countries).collect(),
        movement_types,
        risk_levels: vec![
            ALL.to_string(),
            RiskLevel::High.to_string(),
            RiskLevel::Low.to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AthleteProfile, JumpEvent};

    fn athlete(name: &str, age: u32, position: Position, country: &str, score: i32) -> Athlete {
        Athlete {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            age: Some(age),
            position: Some(position),
            club: Some(format!("{country} Academy")),
            country: Some(country.to_string()),
            avg_efficiency_score: Some(score),
            ..Default::default()
        }
    }

    fn roster() -> Vec<Athlete> {
        vec![
            athlete("Rahul Sharma", 16, Position::Midfielder, "India", 87),
            athlete("Lucas Silva", 17, Position::Defender, "Brazil", 74),
            athlete("Emma Chen", 14, Position::Midfielder, "China", 95),
            athlete("Carlos Mendez", 18, Position::Forward, "Spain", 81),
            athlete("Fatima Ouedraogo", 16, Position::Forward, "Ghana", 55),
        ]
    }

    fn names(athletes: &[Athlete]) -> Vec<&str> {
        athletes.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn open_spec_is_identity() {
        let athletes = roster();
        assert_eq!(apply_filters(&athletes, &FilterSpec::default()), athletes);
        assert!(!FilterSpec::default().is_active());
    }

    #[test]
    fn constraints_combine_with_and() {
        let spec = FilterSpec {
            position: Some(Position::Midfielder),
            min_score: 90,
            ..Default::default()
        };
        assert_eq!(names(&apply_filters(&roster(), &spec)), vec!["Emma Chen"]);
    }

    #[test]
    fn age_group_uses_brackets() {
        let spec = FilterSpec {
            age_group: Some(AgeBracket::From15To17),
            ..Default::default()
        };
        assert_eq!(
            names(&apply_filters(&roster(), &spec)),
            vec!["Rahul Sharma", "Lucas Silva", "Fatima Ouedraogo"]
        );
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let by_club = FilterSpec {
            search: "brazil acad".to_string(),
            ..Default::default()
        };
        assert_eq!(names(&apply_filters(&roster(), &by_club)), vec!["Lucas Silva"]);

        let by_position = FilterSpec {
            search: "FORW".to_string(),
            ..Default::default()
        };
        assert_eq!(
            names(&apply_filters(&roster(), &by_position)),
            vec!["Carlos Mendez", "Fatima Ouedraogo"]
        );
    }

    #[test]
    fn country_match_is_case_sensitive() {
        let spec = FilterSpec {
            country: Some("india".to_string()),
            ..Default::default()
        };
        assert!(apply_filters(&roster(), &spec).is_empty());
    }

    #[test]
    fn missing_fields_fail_active_constraints() {
        let orphan = ScoutedEvent {
            event: JumpEvent {
                athlete_id: "ghost-1".to_string(),
                risk_level: Some(RiskLevel::High),
                movement_type: Some(MovementType::Cutting),
                efficiency_score: Some(70),
                ..Default::default()
            },
            profile: AthleteProfile {
                name: "Athlete ghost-".to_string(),
                position: None,
                club: None,
                country: None,
                age: None,
                known: false,
            },
        };
        let events = vec![orphan];

        for spec in [
            FilterSpec {
                position: Some(Position::Forward),
                ..Default::default()
            },
            FilterSpec {
                country: Some("India".to_string()),
                ..Default::default()
            },
            FilterSpec {
                age_group: Some(AgeBracket::Over17),
                ..Default::default()
            },
        ] {
            assert!(apply_filters(&events, &spec).is_empty(), "{spec:?}");
        }

        let by_movement = FilterSpec {
            movement_type: Some(MovementType::Cutting),
            risk_level: Some(RiskLevel::High),
            search: "cutt".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&events, &by_movement).len(), 1);

        let athletes_have_no_risk = FilterSpec {
            risk_level: Some(RiskLevel::Low),
            ..Default::default()
        };
        assert!(apply_filters(&roster(), &athletes_have_no_risk).is_empty());
    }

    #[test]
    fn constraint_order_does_not_matter() {
        let athletes = roster();
        let by_position = FilterSpec {
            position: Some(Position::Forward),
            ..Default::default()
        };
        let by_score = FilterSpec {
            min_score: 60,
            ..Default::default()
        };
        let both = FilterSpec {
            position: Some(Position::Forward),
            min_score: 60,
            ..Default::default()
        };

        let a = apply_filters(&apply_filters(&athletes, &by_position), &by_score);
        let b = apply_filters(&apply_filters(&athletes, &by_score), &by_position);
        assert_eq!(a, b);
        assert_eq!(a, apply_filters(&athletes, &both));
    }

    #[test]
    fn choices_accept_the_all_sentinel() {
        assert_eq!(parse_choice::<Position>(Some("All")).unwrap(), None);
        assert_eq!(parse_choice::<Position>(None).unwrap(), None);
        assert_eq!(
            parse_choice::<Position>(Some("Defender")).unwrap(),
            Some(Position::Defender)
        );
        assert!(parse_choice::<RiskLevel>(Some("MEDIUM")).is_err());
    }

    #[test]
    fn options_put_all_first_and_sort_countries() {
        let options = filter_options(&roster());
        assert_eq!(
            options.countries,
            vec!["All", "Brazil", "China", "Ghana", "India", "Spain"]
        );
        assert_eq!(options.positions, vec!["All", "Midfielder", "Defender", "Forward"]);
        assert_eq!(options.movement_types, vec!["All"]);
        assert_eq!(options.risk_levels, vec!["All", "HIGH", "LOW"]);
    }
}
