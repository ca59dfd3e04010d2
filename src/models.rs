use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{validation_error, AppResult};
use crate::utils::time::{format_time, parse_date, parse_time};

/// Message returned when a date or time string is malformed
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid date or time format";
/// Message returned when the end time is not after the start time
pub const TIME_ORDER_MESSAGE: &str = "End time must be later than start time";
/// Message returned when the title is blank
pub const EMPTY_TITLE_MESSAGE: &str = "Title must not be empty";

/// A stored calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(with = "crate::utils::time::serde_date")]
    pub date: NaiveDate,
    #[serde(with = "crate::utils::time::serde_time")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::utils::time::serde_time")]
    pub end_time: NaiveTime,
    #[serde(default, with = "crate::utils::time::serde_time_opt")]
    pub reminder_time: Option<NaiveTime>,
}

impl Event {
    /// Build a stored event from a validated draft and a store-assigned id
    pub fn from_draft(id: i64, draft: &EventDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            reminder_time: draft.reminder_time,
        }
    }

    /// Format the time span as "HH:MM - HH:MM"
    pub fn time_span(&self) -> String {
        format!(
            "{} - {}",
            format_time(&self.start_time),
            format_time(&self.end_time)
        )
    }
}

/// Orders events by (date, start_time), then id
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        (a.date, a.start_time, a.id).cmp(&(b.date, b.start_time, b.id))
    });
}

/// A validated event that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reminder_time: Option<NaiveTime>,
}

/// Unvalidated event fields as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
}

impl EventInput {
    /// Validate the raw fields into a draft
    ///
    /// Format errors are reported before the time-order check. An empty
    /// reminder string means no reminder.
    pub fn validate(&self) -> AppResult<EventDraft> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(validation_error(EMPTY_TITLE_MESSAGE));
        }

        let date = parse_date(self.date.trim()).ok_or_else(|| validation_error(INVALID_FORMAT_MESSAGE))?;
        let start_time =
            parse_time(self.start_time.trim()).ok_or_else(|| validation_error(INVALID_FORMAT_MESSAGE))?;
        let end_time =
            parse_time(self.end_time.trim()).ok_or_else(|| validation_error(INVALID_FORMAT_MESSAGE))?;
        let reminder_time = match self.reminder_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_time(raw).ok_or_else(|| validation_error(INVALID_FORMAT_MESSAGE))?),
        };

        if end_time <= start_time {
            return Err(validation_error(TIME_ORDER_MESSAGE));
        }

        Ok(EventDraft {
            title: title.to_string(),
            date,
            start_time,
            end_time,
            reminder_time,
        })
    }
}

/// Field overrides for editing an event; `None` keeps the current value
///
/// `reminder_time: Some(None)` clears the reminder.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reminder_time: Option<Option<String>>,
}

impl EventPatch {
    /// Apply the overrides to `event` and validate the result
    pub fn apply(&self, event: &Event) -> AppResult<EventDraft> {
        let mut input = EventInput::from(event);
        if let Some(title) = &self.title {
            input.title = title.clone();
        }
        if let Some(date) = &self.date {
            input.date = date.clone();
        }
        if let Some(start_time) = &self.start_time {
            input.start_time = start_time.clone();
        }
        if let Some(end_time) = &self.end_time {
            input.end_time = end_time.clone();
        }
        if let Some(reminder_time) = &self.reminder_time {
            input.reminder_time = reminder_time.clone();
        }
        input.validate()
    }
}

impl From<&Event> for EventInput {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            date: crate::utils::time::format_date(&event.date),
            start_time: format_time(&event.start_time),
            end_time: format_time(&event.end_time),
            reminder_time: event.reminder_time.as_ref().map(format_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn input(start: &str, end: &str, reminder: Option<&str>) -> EventInput {
        EventInput {
            title: "standup".to_string(),
            date: "2024-05-01".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            reminder_time: reminder.map(str::to_string),
        }
    }

    fn message(err: Error) -> String {
        match err {
            Error::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_end_after_start() {
        let draft = input("09:00", "09:30", Some("08:55")).validate().unwrap();
        assert_eq!(draft.title, "standup");
        assert_eq!(draft.reminder_time, parse_time("08:55"));
    }

    #[test]
    fn rejects_end_not_after_start() {
        let err = input("09:00", "09:00", None).validate().unwrap_err();
        assert_eq!(message(err), TIME_ORDER_MESSAGE);
        let err = input("10:00", "09:00", None).validate().unwrap_err();
        assert_eq!(message(err), TIME_ORDER_MESSAGE);
    }

    #[test]
    fn rejects_malformed_fields() {
        let err = input("9am", "10:00", None).validate().unwrap_err();
        assert_eq!(message(err), INVALID_FORMAT_MESSAGE);
        let err = input("09:00", "10:00", Some("later")).validate().unwrap_err();
        assert_eq!(message(err), INVALID_FORMAT_MESSAGE);

        let mut bad_date = input("09:00", "10:00", None);
        bad_date.date = "01/05/2024".to_string();
        assert_eq!(message(bad_date.validate().unwrap_err()), INVALID_FORMAT_MESSAGE);
    }

    #[test]
    fn empty_reminder_means_none() {
        let draft = input("09:00", "10:00", Some("")).validate().unwrap();
        assert_eq!(draft.reminder_time, None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut blank = input("09:00", "10:00", None);
        blank.title = "   ".to_string();
        assert_eq!(message(blank.validate().unwrap_err()), EMPTY_TITLE_MESSAGE);
    }

    #[test]
    fn patch_keeps_untouched_fields_and_revalidates() {
        let event = Event::from_draft(3, &input("09:00", "09:30", Some("08:55")).validate().unwrap());

        let moved = EventPatch {
            start_time: Some("10:00".to_string()),
            end_time: Some("11:00".to_string()),
            reminder_time: Some(None),
            ..EventPatch::default()
        }
        .apply(&event)
        .unwrap();
        assert_eq!(moved.title, "standup");
        assert_eq!(moved.start_time, parse_time("10:00").unwrap());
        assert_eq!(moved.reminder_time, None);

        let err = EventPatch {
            end_time: Some("08:00".to_string()),
            ..EventPatch::default()
        }
        .apply(&event)
        .unwrap_err();
        assert_eq!(message(err), TIME_ORDER_MESSAGE);
    }

    #[test]
    fn event_serializes_to_wire_shape() {
        let draft = input("09:00", "09:30", None).validate().unwrap();
        let event = Event::from_draft(7, &draft);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "title": "standup",
                "date": "2024-05-01",
                "start_time": "09:00",
                "end_time": "09:30",
                "reminder_time": null
            })
        );
    }
}
