use std::collections::HashMap;

use crate::models::{Athlete, AthleteProfile, JumpEvent, ScoutedEvent};

/// Athlete snapshot keyed by id, used to decorate events with profile data.
#[derive(Debug, Clone, Default)]
pub struct AthleteIndex {
    athletes: HashMap<String, Athlete>,
}

impl AthleteIndex {
    pub fn new(athletes: impl IntoIterator<Item = Athlete>) -> Self {
        Self {
            athletes: athletes
                .into_iter()
                .map(|athlete| (athlete.id.clone(), athlete))
                .collect(),
        }
    }

    pub fn get(&self, athlete_id: &str) -> Option<&Athlete> {
        self.athletes.get(athlete_id)
    }

    pub fn len(&self) -> usize {
        self.athletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.athletes.is_empty()
    }

    pub fn athletes(&self) -> impl Iterator<Item = &Athlete> {
        self.athletes.values()
    }

    /// Profile for `athlete_id`, or a placeholder built from the first
    /// `id_chars` characters of the id when the athlete is unknown.
    pub fn profile(&self, athlete_id: &str, id_chars: usize) -> AthleteProfile {
        match self.get(athlete_id) {
            Some(athlete) => AthleteProfile {
                name: if athlete.name.is_empty() {
                    placeholder_name(athlete_id, id_chars)
                } else {
                    athlete.name.clone()
                },
                position: athlete.position,
                club: athlete.club.clone().filter(|club| !club.is_empty()),
                country: athlete.country.clone().filter(|country| !country.is_empty()),
                age: athlete.age,
                known: true,
            },
            None => AthleteProfile {
                name: placeholder_name(athlete_id, id_chars),
                position: None,
                club: None,
                country: None,
                age: None,
                known: false,
            },
        }
    }

    pub fn enrich(&self, event: JumpEvent) -> ScoutedEvent {
        let profile = self.profile(&event.athlete_id, FEED_ID_CHARS);
        ScoutedEvent { event, profile }
    }

    pub fn enrich_all(&self, events: impl IntoIterator<Item = JumpEvent>) -> Vec<ScoutedEvent> {
        events.into_iter().map(|event| self.enrich(event)).collect()
    }
}

/// Id prefix length used for unknown athletes in event feeds.
pub const FEED_ID_CHARS: usize = 6;
/// Id prefix length used on the athlete detail view.
pub const DETAIL_ID_CHARS: usize = 8;

pub fn placeholder_name(athlete_id: &str, id_chars: usize) -> String {
    if athlete_id.is_empty() {
        return "Athlete ?".to_string();
    }
    let prefix: String = athlete_id.chars().take(id_chars).collect();
    format!("Athlete {prefix}")
}
