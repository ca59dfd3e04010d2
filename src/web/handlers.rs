use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::components::reminder::send_test_notification;
use crate::error::{AppResult, Error};
use crate::models::{Event, EventInput};
use crate::utils::time::{format_date, format_time};

/// Error response carrying a status and a client-visible message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Schedule not found".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Ids that are not integers name no schedule
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>().map_err(|_| ApiError::not_found())
}

/// Index page listing every schedule
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    rows: Vec<IndexRow<'a>>,
}

struct IndexRow<'a> {
    title: &'a str,
    date: String,
    start: String,
    end: String,
    reminder: String,
}

/// Handler for the index page
pub async fn index_handler(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let events = state.store.list().await?;
    Ok(Html(render_index(&events)?))
}

/// Render the schedule table page
pub fn render_index(events: &[Event]) -> AppResult<String> {
    let rows = events
        .iter()
        .map(|event| IndexRow {
            title: &event.title,
            date: format_date(&event.date),
            start: format_time(&event.start_time),
            end: format_time(&event.end_time),
            reminder: event.reminder_time.as_ref().map(format_time).unwrap_or_default(),
        })
        .collect();

    Ok(IndexTemplate { rows }.render()?)
}

/// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Send a notification through the configured notifier
pub async fn test_reminder_handler(State(state): State<AppState>) -> Response {
    match send_test_notification(state.notifier.as_ref(), &state.notification_title).await {
        Ok(()) => Json(json!({ "status": "success", "message": "Test notification sent" }))
            .into_response(),
        Err(e) => {
            error!("Failed to send test notification: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// List all schedules in time order
pub async fn list_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.store.list().await?))
}

/// Create a schedule
pub async fn create_handler(
    State(state): State<AppState>,
    payload: Result<Json<EventInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let Json(input) = payload?;
    let draft = input.validate()?;
    let event = state.store.create(&draft).await?;
    info!("Created schedule {} \"{}\"", event.id, event.title);
    Ok((StatusCode::CREATED, Json(event)))
}

/// Get one schedule
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let id = parse_id(&id)?;
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// Replace every field of a schedule
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EventInput>, JsonRejection>,
) -> ApiResult<Json<Event>> {
    let id = parse_id(&id)?;
    // Unknown ids are reported as 404 before the body is looked at
    if state.store.get(id).await?.is_none() {
        return Err(ApiError::not_found());
    }

    let Json(input) = payload?;
    let draft = input.validate()?;
    let event = state.store.update(id, &draft).await?;
    info!("Updated schedule {}", id);
    Ok(Json(event))
}

/// Delete a schedule
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;
    info!("Deleted schedule {}", id);
    Ok(StatusCode::NO_CONTENT)
}
