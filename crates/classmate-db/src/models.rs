use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Category of a schedule event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Lesson,
    Exam,
    Assignment,
    Event,
}

impl EventType {
    /// Every variant, in display order.
    pub const ALL: [EventType; 4] = [Self::Lesson, Self::Exam, Self::Assignment, Self::Event];
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lesson => "lesson",
            Self::Exam => "exam",
            Self::Assignment => "assignment",
            Self::Event => "event",
        };
        f.write_str(s)
    }
}

impl FromStr for EventType {
    type Err = EventTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(Self::Lesson),
            "exam" => Ok(Self::Exam),
            "assignment" => Ok(Self::Assignment),
            "event" => Ok(Self::Event),
            other => Err(EventTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`EventType`] string.
#[derive(Debug, Clone)]
pub struct EventTypeParseError(pub String);

impl fmt::Display for EventTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid event type: {:?} (expected lesson, exam, assignment, or event)",
            self.0
        )
    }
}

impl std::error::Error for EventTypeParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A calendar entry on the teacher's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub event_type: EventType,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Write/query parameters
// ---------------------------------------------------------------------------

/// Fields supplied when creating an event.
#[derive(Debug, Clone)]
pub struct NewScheduleEvent<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub date: NaiveDate,
    pub event_type: EventType,
    pub color: Option<&'a str>,
}

/// A partial update. `None` leaves a column untouched.
///
/// The nullable columns take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default)]
pub struct ScheduleEventPatch<'a> {
    pub title: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub date: Option<NaiveDate>,
    pub event_type: Option<EventType>,
    pub color: Option<Option<&'a str>>,
}

impl ScheduleEventPatch<'_> {
    /// True when the patch would change no column.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.event_type.is_none()
            && self.color.is_none()
    }
}

/// Date filter for listing events. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Range covering exactly one day.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_display_roundtrip() {
        for variant in EventType::ALL {
            let s = variant.to_string();
            let parsed: EventType = s.parse().unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn event_type_rejects_unknown() {
        let err = "holiday".parse::<EventType>().unwrap_err();
        assert!(err.to_string().contains("holiday"));
    }

    #[test]
    fn empty_patch() {
        assert!(ScheduleEventPatch::default().is_empty());
        let patch = ScheduleEventPatch {
            color: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn range_on_single_day() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let range = DateRange::on(d);
        assert_eq!(range.from, Some(d));
        assert_eq!(range.to, Some(d));
    }
}
