//! Database query functions for the `schedule_events` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DateRange, NewScheduleEvent, ScheduleEvent, ScheduleEventPatch};

/// Insert a new event. Returns the stored row with server-generated
/// defaults (id, created_at, updated_at).
pub async fn insert_event(pool: &PgPool, new: &NewScheduleEvent<'_>) -> Result<ScheduleEvent> {
    let event = sqlx::query_as::<_, ScheduleEvent>(
        "INSERT INTO schedule_events (title, description, date, event_type, color) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.title)
    .bind(new.description)
    .bind(new.date)
    .bind(new.event_type)
    .bind(new.color)
    .fetch_one(pool)
    .await
    .context("failed to insert schedule event")?;

    Ok(event)
}

/// Fetch an event by its ID.
pub async fn get_event(pool: &PgPool, id: Uuid) -> Result<Option<ScheduleEvent>> {
    let event = sqlx::query_as::<_, ScheduleEvent>("SELECT * FROM schedule_events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch schedule event")?;

    Ok(event)
}

/// List events inside `range`, ordered by date ascending.
///
/// Events on the same day keep their creation order.
pub async fn list_events(pool: &PgPool, range: DateRange) -> Result<Vec<ScheduleEvent>> {
    let events = sqlx::query_as::<_, ScheduleEvent>(
        "SELECT * FROM schedule_events \
         WHERE ($1::date IS NULL OR date >= $1) \
           AND ($2::date IS NULL OR date <= $2) \
         ORDER BY date ASC, created_at ASC",
    )
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await
    .context("failed to list schedule events")?;

    Ok(events)
}

/// Apply a partial update and bump `updated_at`.
///
/// Returns `None` when no event has the given ID.
pub async fn update_event(
    pool: &PgPool,
    id: Uuid,
    patch: &ScheduleEventPatch<'_>,
) -> Result<Option<ScheduleEvent>> {
    let event = sqlx::query_as::<_, ScheduleEvent>(
        "UPDATE schedule_events SET \
             title = COALESCE($2, title), \
             description = CASE WHEN $3 THEN $4 ELSE description END, \
             date = COALESCE($5, date), \
             event_type = COALESCE($6, event_type), \
             color = CASE WHEN $7 THEN $8 ELSE color END, \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(patch.title)
    .bind(patch.description.is_some())
    .bind(patch.description.flatten())
    .bind(patch.date)
    .bind(patch.event_type)
    .bind(patch.color.is_some())
    .bind(patch.color.flatten())
    .fetch_optional(pool)
    .await
    .context("failed to update schedule event")?;

    Ok(event)
}

/// Delete an event. Returns `false` when no row matched.
pub async fn delete_event(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM schedule_events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete schedule event")?;

    Ok(result.rows_affected() > 0)
}

/// Count all stored events.
pub async fn count_events(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedule_events")
        .fetch_one(pool)
        .await
        .context("failed to count schedule events")?;

    Ok(count)
}
