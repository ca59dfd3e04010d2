mod common;

use common::{at, event};
use schedule_reminder::components::reminder::{due, InMemoryNotifiedSet, NotifiedSet, OccasionKey};
use schedule_reminder::models::Event;

fn ids(events: &[Event]) -> Vec<i64> {
    let mut ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    ids.sort();
    ids
}

/// Every matching event is due exactly when its key is absent
#[test]
fn test_due_excludes_exactly_the_notified_keys() {
    let events = vec![
        event(1, "a", "2024-05-01", Some("10:00")),
        event(2, "b", "2024-05-01", Some("10:00")),
        event(3, "c", "2024-05-01", Some("10:00")),
    ];
    let notified = InMemoryNotifiedSet::new();
    notified.insert(OccasionKey::for_event(&events[1]).unwrap());

    let found = due(at("2024-05-01 10:00"), &events, &notified);
    assert_eq!(ids(&found), vec![1, 3]);
}

#[test]
fn test_second_call_after_insert_excludes_event() {
    let events = vec![event(1, "standup", "2024-05-01", Some("08:55"))];
    let notified = InMemoryNotifiedSet::new();
    let now = at("2024-05-01 08:55:10");

    let first = due(now, &events, &notified);
    assert_eq!(first.len(), 1);
    assert!(notified.insert(OccasionKey::for_event(&first[0]).unwrap()));

    assert!(due(now, &events, &notified).is_empty());
}

#[test]
fn test_other_dates_and_minutes_are_excluded() {
    let events = vec![
        event(1, "yesterday", "2024-04-30", Some("10:00")),
        event(2, "tomorrow", "2024-05-02", Some("10:00")),
        event(3, "same hour", "2024-05-01", Some("10:01")),
        event(4, "earlier", "2024-05-01", Some("09:59")),
        event(5, "no reminder", "2024-05-01", None),
    ];
    let notified = InMemoryNotifiedSet::new();

    assert!(due(at("2024-05-01 10:00"), &events, &notified).is_empty());
}

/// Reminder at 08:55 fires at 08:55 and is missed at 08:56
#[test]
fn test_standup_scenario_has_no_catch_up() {
    let events = vec![event(1, "standup", "2024-05-01", Some("08:55"))];
    let notified = InMemoryNotifiedSet::new();

    let found = due(at("2024-05-01 08:55"), &events, &notified);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "standup");

    assert!(due(at("2024-05-01 08:56"), &events, &notified).is_empty());
}

#[test]
fn test_shared_reminder_time_returns_all_events() {
    let events = vec![
        event(1, "planning", "2024-05-01", Some("10:00")),
        event(2, "coffee", "2024-05-01", Some("10:00")),
    ];
    let notified = InMemoryNotifiedSet::new();

    let found = due(at("2024-05-01 10:00:30"), &events, &notified);
    assert_eq!(ids(&found), vec![1, 2]);
}

#[test]
fn test_edited_reminder_time_is_a_new_occasion() {
    let mut standup = event(1, "standup", "2024-05-01", Some("08:55"));
    let notified = InMemoryNotifiedSet::new();
    notified.insert(OccasionKey::for_event(&standup).unwrap());

    standup.reminder_time = chrono::NaiveTime::from_hms_opt(9, 0, 0);
    let found = due(at("2024-05-01 09:00"), &[standup], &notified);
    assert_eq!(found.len(), 1);
}
