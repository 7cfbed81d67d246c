use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use classmate_core::flows::activities::{self, ActivitiesInput, ActivitiesOutput};
use classmate_core::flows::assessment::{self, AssessmentInput, AssessmentOutput};
use classmate_core::flows::essay_grading::{
    self, BatchGradingInput, BatchGradingOutput, EssayGradingInput, EssayGradingOutput,
};
use classmate_core::flows::lesson_plan::{self, LessonPlanInput, LessonPlanOutput};
use classmate_core::flows::material::{self, MaterialInput, MaterialOutput};
use classmate_core::model::ModelError;
use classmate_core::schedule::{
    self, CreateEventRequest, ListEventsQuery, ScheduleError, UpdateEventRequest,
};
use classmate_core::{FlowError, GenerativeModel};
use classmate_db::models::ScheduleEvent;

/// Upcoming events shown on the index page.
const INDEX_EVENT_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<dyn GenerativeModel>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    body: serde_json::Value,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }

    fn invalid_input(fields: impl Serialize) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": "Invalid input", "fields": fields }),
        }
    }

    /// Map a flow failure; `action` completes "Failed to ...".
    pub fn flow(action: &str, err: FlowError) -> Self {
        match err {
            FlowError::Validation(fields) => Self::invalid_input(fields),
            FlowError::Model(ModelError::MissingApiKey) => {
                error!("model API key is not configured");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI service configuration error: API key missing",
                )
            }
            other => {
                warn!(action, error = %other, "flow failed");
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    body: json!({
                        "error": format!("Failed to {action}"),
                        "details": other.to_string(),
                    }),
                }
            }
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(fields) => Self::invalid_input(fields),
            ScheduleError::NotFound(id) => Self::not_found(format!("schedule event {id} not found")),
            ScheduleError::Database(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/generate-lesson-plan", post(generate_lesson_plan))
        .route("/api/create-assessment", post(create_assessment))
        .route("/api/grade-essay", post(grade_essay))
        .route("/api/batch-grade-essays", post(batch_grade_essays))
        .route(
            "/api/generate-differentiated-activities",
            post(generate_activities),
        )
        .route("/api/generate-material", post(generate_material))
        .route("/api/schedule", get(list_events).post(create_event))
        .route(
            "/api/schedule/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let model = state.model.name().to_string();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%model, "classmate serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("classmate serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

const FEATURES: [(&str, &str); 6] = [
    ("Lesson planner", "/api/generate-lesson-plan"),
    ("Assessment generator", "/api/create-assessment"),
    ("Essay grader", "/api/grade-essay"),
    ("Batch essay grader", "/api/batch-grade-essays"),
    ("Differentiated activities", "/api/generate-differentiated-activities"),
    ("Material studio", "/api/generate-material"),
];

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_index(events: &[ScheduleEvent]) -> String {
    let features = FEATURES
        .iter()
        .map(|(name, path)| format!("<li>{name}: <code>POST {path}</code></li>"))
        .collect::<Vec<_>>()
        .join("");

    let rows = if events.is_empty() {
        "<tr><td colspan=\"3\">No upcoming events.</td></tr>".to_string()
    } else {
        events
            .iter()
            .map(|e| {
                format!(
                    "<tr><td>{date}</td><td><a href=\"/api/schedule/{id}\">{title}</a></td><td>{kind}</td></tr>",
                    date = e.date,
                    id = e.id,
                    title = escape_html(&e.title),
                    kind = e.event_type,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "<!DOCTYPE html>\
<html><head><title>classmate</title></head><body>\
<h1>classmate</h1>\
<ul>{features}</ul>\
<h2>Upcoming</h2>\
<p><a href=\"/api/schedule\">/api/schedule</a></p>\
<table><tr><th>Date</th><th>Event</th><th>Type</th></tr>{rows}</table>\
</body></html>"
    )
}

async fn index(State(state): State<AppState>) -> Result<Response, AppError> {
    let today = chrono::Utc::now().date_naive();
    let events = schedule::upcoming(&state.pool, today, INDEX_EVENT_LIMIT).await?;
    Ok(Html(render_index(&events)).into_response())
}

// ---------------------------------------------------------------------------
// Flow handlers
// ---------------------------------------------------------------------------

async fn generate_lesson_plan(
    State(state): State<AppState>,
    Json(input): Json<LessonPlanInput>,
) -> Result<Json<LessonPlanOutput>, AppError> {
    let out = lesson_plan::run(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("generate lesson plan", e))?;
    Ok(Json(out))
}

async fn create_assessment(
    State(state): State<AppState>,
    Json(input): Json<AssessmentInput>,
) -> Result<Json<AssessmentOutput>, AppError> {
    let out = assessment::run(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("create assessment", e))?;
    Ok(Json(out))
}

async fn grade_essay(
    State(state): State<AppState>,
    Json(input): Json<EssayGradingInput>,
) -> Result<Json<EssayGradingOutput>, AppError> {
    let out = essay_grading::grade(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("grade essay", e))?;
    Ok(Json(out))
}

async fn batch_grade_essays(
    State(state): State<AppState>,
    Json(input): Json<BatchGradingInput>,
) -> Result<Json<BatchGradingOutput>, AppError> {
    let out = essay_grading::grade_batch(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("grade essays", e))?;
    Ok(Json(out))
}

async fn generate_activities(
    State(state): State<AppState>,
    Json(input): Json<ActivitiesInput>,
) -> Result<Json<ActivitiesOutput>, AppError> {
    let out = activities::run(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("generate activities", e))?;
    Ok(Json(out))
}

async fn generate_material(
    State(state): State<AppState>,
    Json(input): Json<MaterialInput>,
) -> Result<Json<MaterialOutput>, AppError> {
    let out = material::run(state.model.as_ref(), &input)
        .await
        .map_err(|e| AppError::flow("generate material", e))?;
    Ok(Json(out))
}

// ---------------------------------------------------------------------------
// Schedule handlers
// ---------------------------------------------------------------------------

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<ScheduleEvent>>, AppError> {
    Ok(Json(schedule::list(&state.pool, &query).await?))
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<ScheduleEvent>), AppError> {
    let event = schedule::create(&state.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleEvent>, AppError> {
    Ok(Json(schedule::get(&state.pool, id).await?))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<ScheduleEvent>, AppError> {
    Ok(Json(schedule::update(&state.pool, id, &req).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    schedule::delete(&state.pool, id).await?;
    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
