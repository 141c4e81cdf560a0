//! Directory feed ingestion
//!
//! ## Responsibilities
//!
//! - Fold the feed's optional alias id fields into one canonical
//!   primary/secondary id shape, so matching stays free of field-name
//!   special-casing
//! - Derive an event's schedule instant from a calendar date plus an
//!   optional free-text time
//!
//! The upstream directory stores member numbers under several historical
//! field names; whichever is present first (in priority order) becomes the
//! primary id and the rest become secondary ids.

use super::types::{AttendanceRecord, Event, Registrant};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registrant entry as pushed by the directory feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantUpdate {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub group_tag: Option<String>,
    /// Canonical registration number field
    #[serde(default)]
    pub registration_no: Option<String>,
    /// Issued card number (older entries carry only this)
    #[serde(default)]
    pub card_no: Option<String>,
    /// Free-form reference number
    #[serde(default)]
    pub reference_no: Option<String>,
}

/// Event entry as pushed by the directory feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventUpdate {
    pub id: String,
    pub title: String,
    /// Calendar date, e.g. "2025-08-07"
    pub date: NaiveDate,
    /// Free-text time of day, e.g. "8:00 AM" (optional)
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendance: HashMap<String, AttendanceRecord>,
}

/// Accepted free-text time shapes, tried in order
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p", "%I %p", "%I%p"];

/// Parse a free-text time of day. Returns midnight when absent or
/// unparseable; a bad time string never rejects the event.
fn parse_time_of_day(text: Option<&str>) -> NaiveTime {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight");

    let Some(text) = text else {
        return midnight;
    };
    let text = text.trim();
    if text.is_empty() {
        return midnight;
    }

    for format in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(&text.to_uppercase(), format) {
            return t;
        }
    }

    tracing::debug!(time = %text, "Unparseable event time, defaulting to start of day");
    midnight
}

/// Fold a feed registrant into the canonical shape.
///
/// Priority order for the primary id: registration_no, card_no,
/// reference_no. Remaining present ids become secondary ids. Entries with no
/// id at all keep an empty primary id and are simply unmatched.
pub fn fold_registrant(update: RegistrantUpdate) -> Registrant {
    let mut ids: Vec<String> = [update.registration_no, update.card_no, update.reference_no]
        .into_iter()
        .flatten()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let primary_id = if ids.is_empty() {
        String::new()
    } else {
        ids.remove(0)
    };

    Registrant {
        key: update.key,
        primary_id,
        secondary_ids: ids,
        display_name: update.display_name,
        group_tag: update.group_tag,
    }
}

/// Build the engine-side event from a feed event
pub fn fold_event(update: EventUpdate) -> Event {
    let time = parse_time_of_day(update.time.as_deref());
    let scheduled_at = Utc.from_utc_datetime(&update.date.and_time(time));

    Event {
        id: update.id,
        title: update.title,
        scheduled_at,
        location: update.location,
        attendance: update.attendance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn update(reg: Option<&str>, card: Option<&str>, reference: Option<&str>) -> RegistrantUpdate {
        RegistrantUpdate {
            key: "m1".to_string(),
            display_name: "Ana Cruz".to_string(),
            group_tag: None,
            registration_no: reg.map(String::from),
            card_no: card.map(String::from),
            reference_no: reference.map(String::from),
        }
    }

    #[test]
    fn test_fold_prefers_registration_no() {
        let r = fold_registrant(update(Some("2025-001"), Some("C-77"), Some("REF9")));
        assert_eq!(r.primary_id, "2025-001");
        assert_eq!(r.secondary_ids, vec!["C-77", "REF9"]);
    }

    #[test]
    fn test_fold_falls_through_to_card_no() {
        let r = fold_registrant(update(None, Some("C-77"), None));
        assert_eq!(r.primary_id, "C-77");
        assert!(r.secondary_ids.is_empty());
    }

    #[test]
    fn test_fold_blank_ids_are_skipped() {
        let r = fold_registrant(update(Some("  "), Some("C-77"), None));
        assert_eq!(r.primary_id, "C-77");
    }

    #[test]
    fn test_time_parsing_variants() {
        assert_eq!(parse_time_of_day(Some("8:00 AM")).hour(), 8);
        assert_eq!(parse_time_of_day(Some("14:30")).hour(), 14);
        assert_eq!(parse_time_of_day(Some("7 PM")).hour(), 19);
        assert_eq!(parse_time_of_day(Some("whenever")).hour(), 0);
        assert_eq!(parse_time_of_day(None).hour(), 0);
    }

    #[test]
    fn test_fold_event_combines_date_and_time() {
        let e = fold_event(EventUpdate {
            id: "e1".to_string(),
            title: "General Assembly".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 8, 7).unwrap(),
            time: Some("8:30 AM".to_string()),
            location: None,
            attendance: HashMap::new(),
        });
        assert_eq!(e.scheduled_at.hour(), 8);
        assert_eq!(e.scheduled_at.minute(), 30);
    }
}
