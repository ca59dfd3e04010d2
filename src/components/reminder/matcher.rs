//! Reminder matching and notification de-duplication.
//!
//! An event is a candidate when its date is today and its reminder time equals
//! the current wall-clock minute. A candidate is due unless its occasion key
//! `(event id, date, reminder time)` is already in the notified set.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{config_error, Error};
use crate::models::Event;
use crate::utils::time::truncate_to_minute;

/// Identifies one reminder occasion of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccasionKey {
    pub event_id: i64,
    pub date: NaiveDate,
    pub reminder_time: NaiveTime,
}

impl OccasionKey {
    /// Key for an event's reminder, if it has one
    pub fn for_event(event: &Event) -> Option<Self> {
        event.reminder_time.map(|reminder_time| Self {
            event_id: event.id,
            date: event.date,
            reminder_time,
        })
    }
}

impl fmt::Display for OccasionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.event_id,
            self.date.format("%Y-%m-%d"),
            self.reminder_time.format("%H:%M")
        )
    }
}

/// Set of occasions that already produced a notification
pub trait NotifiedSet: Send + Sync {
    fn contains(&self, key: &OccasionKey) -> bool;

    /// Returns false if the key was already present
    fn insert(&self, key: OccasionKey) -> bool;

    /// Forget keys dated before `date`, returning how many were removed
    fn prune_before(&self, date: NaiveDate) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime notified set
#[derive(Debug, Default)]
pub struct InMemoryNotifiedSet {
    keys: Mutex<HashSet<OccasionKey>>,
}

impl InMemoryNotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> std::sync::MutexGuard<'_, HashSet<OccasionKey>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotifiedSet for InMemoryNotifiedSet {
    fn contains(&self, key: &OccasionKey) -> bool {
        self.keys().contains(key)
    }

    fn insert(&self, key: OccasionKey) -> bool {
        self.keys().insert(key)
    }

    fn prune_before(&self, date: NaiveDate) -> usize {
        let mut keys = self.keys();
        let before = keys.len();
        keys.retain(|key| key.date >= date);
        before - keys.len()
    }

    fn len(&self) -> usize {
        self.keys().len()
    }
}

/// How a reminder time is compared with the current minute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Reminder time must equal the current minute
    #[default]
    ExactMinute,
    /// Any reminder time at or before the current minute, on today's date
    CatchUp,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" | "exact-minute" => Ok(Self::ExactMinute),
            "catch-up" | "catchup" => Ok(Self::CatchUp),
            other => Err(config_error(&format!("Unknown reminder match mode: {}", other))),
        }
    }
}

/// Events whose reminder matches `now` and has not been notified yet
pub fn due(now: NaiveDateTime, events: &[Event], notified: &dyn NotifiedSet) -> Vec<Event> {
    due_with_mode(now, events, notified, MatchMode::ExactMinute)
}

/// Same as [`due`] with an explicit match mode
pub fn due_with_mode(
    now: NaiveDateTime,
    events: &[Event],
    notified: &dyn NotifiedSet,
    mode: MatchMode,
) -> Vec<Event> {
    let now = truncate_to_minute(now);
    let today = now.date();
    let minute = now.time();

    events
        .iter()
        .filter(|event| event.date == today)
        .filter_map(|event| OccasionKey::for_event(event).map(|key| (event, key)))
        .filter(|(_, key)| match mode {
            MatchMode::ExactMinute => key.reminder_time == minute,
            MatchMode::CatchUp => key.reminder_time <= minute,
        })
        .filter(|(_, key)| !notified.contains(key))
        .map(|(event, _)| event.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::{parse_date, parse_time};

    fn event(id: i64, date: &str, reminder: Option<&str>) -> Event {
        Event {
            id,
            title: format!("event {id}"),
            date: parse_date(date).unwrap(),
            start_time: parse_time("09:00").unwrap(),
            end_time: parse_time("09:30").unwrap(),
            reminder_time: reminder.map(|r| parse_time(r).unwrap()),
        }
    }

    fn at(date: &str, time: &str, seconds: u32) -> NaiveDateTime {
        let t = parse_time(time).unwrap();
        parse_date(date)
            .unwrap()
            .and_hms_opt(chrono::Timelike::hour(&t), chrono::Timelike::minute(&t), seconds)
            .unwrap()
    }

    #[test]
    fn seconds_are_ignored() {
        let events = vec![event(1, "2024-05-01", Some("08:55"))];
        let set = InMemoryNotifiedSet::new();
        assert_eq!(due(at("2024-05-01", "08:55", 59), &events, &set).len(), 1);
    }

    #[test]
    fn events_without_reminder_never_match() {
        let events = vec![event(1, "2024-05-01", None)];
        let set = InMemoryNotifiedSet::new();
        assert!(due(at("2024-05-01", "09:00", 0), &events, &set).is_empty());
    }

    #[test]
    fn catch_up_mode_matches_earlier_minutes_of_today() {
        let events = vec![
            event(1, "2024-05-01", Some("08:55")),
            event(2, "2024-05-01", Some("09:10")),
            event(3, "2024-04-30", Some("08:00")),
        ];
        let set = InMemoryNotifiedSet::new();
        let found = due_with_mode(at("2024-05-01", "09:00", 0), &events, &set, MatchMode::CatchUp);
        assert_eq!(found.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn prune_drops_only_older_dates() {
        let set = InMemoryNotifiedSet::new();
        set.insert(OccasionKey::for_event(&event(1, "2024-04-30", Some("08:00"))).unwrap());
        set.insert(OccasionKey::for_event(&event(2, "2024-05-01", Some("08:00"))).unwrap());
        assert_eq!(set.prune_before(parse_date("2024-05-01").unwrap()), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn key_display_matches_legacy_format() {
        let key = OccasionKey::for_event(&event(12, "2024-05-01", Some("08:55"))).unwrap();
        assert_eq!(key.to_string(), "12_2024-05-01_08:55");
    }

    #[test]
    fn match_mode_parses() {
        assert_eq!("exact".parse::<MatchMode>().unwrap(), MatchMode::ExactMinute);
        assert_eq!("Catch-Up".parse::<MatchMode>().unwrap(), MatchMode::CatchUp);
        assert!("window".parse::<MatchMode>().is_err());
    }
}
