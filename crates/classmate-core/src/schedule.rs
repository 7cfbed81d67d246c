//! Schedule events: request validation on top of the `schedule_events`
//! queries.
//!
//! Requests arrive with dates and event types as strings so that bad
//! values are reported per field instead of failing deserialization.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use classmate_db::models::{
    DateRange, EventType, NewScheduleEvent, ScheduleEvent, ScheduleEventPatch,
};
use classmate_db::queries::schedule_events;

use crate::validate::FieldErrors;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("schedule event {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<FieldErrors> for ScheduleError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub event_type: String,
    pub color: Option<String>,
}

/// Partial update. An absent field is left unchanged; `null` clears the
/// nullable `description` and `color`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub date: Option<String>,
    pub event_type: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

/// Filter for listing. `date` selects one day and takes precedence over
/// the inclusive `from`/`to` bounds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListEventsQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn parse_date(errors: &mut FieldErrors, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "Date is required.");
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Date must be a valid calendar date (YYYY-MM-DD).");
            None
        }
    }
}

fn parse_event_type(errors: &mut FieldErrors, value: &str) -> Option<EventType> {
    match value.trim().parse() {
        Ok(t) => Some(t),
        Err(_) => {
            errors.add(
                "eventType",
                "Event type must be one of lesson, exam, assignment, event.",
            );
            None
        }
    }
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    errors.min_len("title", title, 1, "Title is required.");
}

/// Blank optional text is stored as NULL.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl CreateEventRequest {
    fn to_new(&self) -> Result<NewScheduleEvent<'_>, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &self.title);
        let date = parse_date(&mut errors, "date", &self.date);
        let event_type = parse_event_type(&mut errors, &self.event_type);

        match (date, event_type) {
            (Some(date), Some(event_type)) if errors.is_empty() => Ok(NewScheduleEvent {
                title: self.title.trim(),
                description: non_blank(self.description.as_deref()),
                date,
                event_type,
                color: non_blank(self.color.as_deref()),
            }),
            _ => Err(errors),
        }
    }
}

impl UpdateEventRequest {
    fn to_patch(&self) -> Result<ScheduleEventPatch<'_>, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        let date = self
            .date
            .as_deref()
            .and_then(|d| parse_date(&mut errors, "date", d));
        let event_type = self
            .event_type
            .as_deref()
            .and_then(|t| parse_event_type(&mut errors, t));
        errors.into_result()?;

        Ok(ScheduleEventPatch {
            title: self.title.as_deref().map(str::trim),
            description: self.description.as_ref().map(|d| non_blank(d.as_deref())),
            date,
            event_type,
            color: self.color.as_ref().map(|c| non_blank(c.as_deref())),
        })
    }
}

impl ListEventsQuery {
    fn to_range(&self) -> Result<DateRange, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut parse = |field: &str, value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .and_then(|v| parse_date(&mut errors, field, v))
        };

        let range = match parse("date", &self.date) {
            Some(day) => DateRange::on(day),
            None => DateRange {
                from: parse("from", &self.from),
                to: parse("to", &self.to),
            },
        };
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if from > to {
                errors.add("from", "Start date must not be after end date.");
            }
        }
        errors.into_result().map(|()| range)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub async fn create(
    pool: &PgPool,
    req: &CreateEventRequest,
) -> Result<ScheduleEvent, ScheduleError> {
    let new = req.to_new()?;
    let event = schedule_events::insert_event(pool, &new).await?;
    info!(
        event_id = %event.id,
        date = %event.date,
        event_type = %event.event_type,
        "schedule event created"
    );
    Ok(event)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<ScheduleEvent, ScheduleError> {
    schedule_events::get_event(pool, id)
        .await?
        .ok_or(ScheduleError::NotFound(id))
}

pub async fn list(
    pool: &PgPool,
    query: &ListEventsQuery,
) -> Result<Vec<ScheduleEvent>, ScheduleError> {
    let range = query.to_range()?;
    Ok(schedule_events::list_events(pool, range).await?)
}

/// Events on or after `today`, soonest first, at most `limit`.
pub async fn upcoming(
    pool: &PgPool,
    today: NaiveDate,
    limit: usize,
) -> Result<Vec<ScheduleEvent>, ScheduleError> {
    let range = DateRange {
        from: Some(today),
        to: None,
    };
    let mut events = schedule_events::list_events(pool, range).await?;
    events.truncate(limit);
    Ok(events)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateEventRequest,
) -> Result<ScheduleEvent, ScheduleError> {
    let patch = req.to_patch()?;
    let event = schedule_events::update_event(pool, id, &patch)
        .await?
        .ok_or(ScheduleError::NotFound(id))?;
    info!(event_id = %id, "schedule event updated");
    Ok(event)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ScheduleError> {
    if !schedule_events::delete_event(pool, id).await? {
        return Err(ScheduleError::NotFound(id));
    }
    info!(event_id = %id, "schedule event deleted");
    Ok(())
}
