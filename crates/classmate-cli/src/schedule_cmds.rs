//! `classmate schedule` commands: list, add, update and remove events.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use classmate_core::schedule::{self, CreateEventRequest, ListEventsQuery, UpdateEventRequest};
use classmate_db::models::ScheduleEvent;

use crate::ScheduleCommands;

pub async fn run_schedule_command(command: ScheduleCommands, pool: &PgPool) -> Result<()> {
    match command {
        ScheduleCommands::List { date, from, to } => {
            let query = ListEventsQuery { date, from, to };
            let events = schedule::list(pool, &query).await?;
            print_events(&events);
        }
        ScheduleCommands::Add {
            title,
            date,
            event_type,
            description,
            color,
        } => {
            let req = CreateEventRequest {
                title,
                description,
                date,
                event_type,
                color,
            };
            let event = schedule::create(pool, &req).await?;
            println!("Added {} ({})", event.title, event.id);
            print_event(&event);
        }
        ScheduleCommands::Update {
            id,
            title,
            date,
            event_type,
            description,
            color,
            clear_description,
            clear_color,
        } => {
            let id = parse_id(&id)?;
            let req = UpdateEventRequest {
                title,
                date,
                event_type,
                description: patch_field(description, clear_description),
                color: patch_field(color, clear_color),
            };
            let event = schedule::update(pool, id, &req).await?;
            println!("Updated {}", event.id);
            print_event(&event);
        }
        ScheduleCommands::Remove { id } => {
            let id = parse_id(&id)?;
            schedule::delete(pool, id).await?;
            println!("Removed {id}");
        }
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("invalid event ID: {id}"))
}

/// `--clear-x` wins over a value; neither leaves the field untouched.
fn patch_field(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear { Some(None) } else { value.map(Some) }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn print_events(events: &[ScheduleEvent]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    println!(
        "{:<38} {:<12} {:<12} {:<30}",
        "ID", "DATE", "TYPE", "TITLE"
    );
    println!("{}", "-".repeat(92));
    for event in events {
        println!(
            "{:<38} {:<12} {:<12} {:<30}",
            event.id,
            event.date,
            event.event_type,
            truncate(&event.title, 30)
        );
    }
}

fn print_event(event: &ScheduleEvent) {
    println!("  date: {}", event.date);
    println!("  type: {}", event.event_type);
    if let Some(description) = &event.description {
        println!("  description: {description}");
    }
    if let Some(color) = &event.color {
        println!("  color: {color}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_flag_overrides_value() {
        assert_eq!(patch_field(Some("red".into()), true), Some(None));
        assert_eq!(patch_field(Some("red".into()), false), Some(Some("red".into())));
        assert_eq!(patch_field(None, false), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 30), "short");
        let long = "é".repeat(40);
        let cut = truncate(&long, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn bad_id_is_reported() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(format!("{err:#}").contains("invalid event ID: not-a-uuid"));
    }
}
