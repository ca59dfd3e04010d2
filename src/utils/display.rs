use crate::models::Event;
use crate::utils::time::{format_date, format_time};

/// Render events as a fixed-width table, numbered from 1
///
/// When `show_ids` is false the position column is the only identifier, which
/// is what the offline client's `edit` and `remove` commands take.
pub fn format_table(events: &[Event], show_ids: bool) -> String {
    if events.is_empty() {
        return "No schedules.".to_string();
    }

    let title_width = events
        .iter()
        .map(|e| e.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("Title".len());

    let key_header = if show_ids { "ID" } else { "#" };
    let mut out = format!(
        "{:>4}  {:<title_width$}  {:<10}  {:<5}  {:<5}  {}\n",
        key_header, "Title", "Date", "Start", "End", "Reminder"
    );

    for (position, event) in events.iter().enumerate() {
        let key = if show_ids { event.id } else { position as i64 + 1 };
        out.push_str(&format!(
            "{:>4}  {:<title_width$}  {:<10}  {:<5}  {:<5}  {}\n",
            key,
            event.title,
            format_date(&event.date),
            format_time(&event.start_time),
            format_time(&event.end_time),
            event.reminder_time.as_ref().map(format_time).unwrap_or_default(),
        ));
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventInput;

    fn event(id: i64, title: &str) -> Event {
        let draft = EventInput {
            title: title.to_string(),
            date: "2024-05-01".to_string(),
            start_time: "09:00".to_string(),
            end_time: "09:30".to_string(),
            reminder_time: Some("08:55".to_string()),
        }
        .validate()
        .unwrap();
        Event::from_draft(id, &draft)
    }

    #[test]
    fn numbers_rows_by_position_or_id() {
        let events = vec![event(7, "standup"), event(9, "review")];

        let by_position = format_table(&events, false);
        let lines: Vec<&str> = by_position.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].trim_start().starts_with("1  standup"));
        assert!(lines[2].trim_start().starts_with("2  review"));

        let by_id = format_table(&events, true);
        assert!(by_id.lines().nth(1).unwrap().trim_start().starts_with("7  standup"));
    }

    #[test]
    fn empty_table_has_message() {
        assert_eq!(format_table(&[], true), "No schedules.");
    }
}
