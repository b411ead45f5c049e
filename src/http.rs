use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::TimeZone;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alloc::{Allocator, Denial};
use crate::model::Ms;
use crate::observability;
use crate::schedule;

#[derive(Clone)]
pub struct AppState {
    pub allocator: Arc<Allocator>,
    pub tz: Tz,
}

#[derive(Deserialize)]
struct SlotQuery {
    /// Client name; `?q=` on the wire.
    q: String,
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot_end: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/getTimeSlot", get(get_time_slot))
        .with_state(state)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        message: "Service is Active".into(),
    })
}

async fn get_time_slot(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> Json<SlotResponse> {
    let started = Instant::now();
    let now = schedule::now_ms();
    let result = state.allocator.request_slot(&query.q, now).await;

    metrics::counter!(
        observability::REQUESTS_TOTAL,
        "outcome" => observability::outcome_label(&result)
    )
    .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    let response = match result {
        Ok(slot) => {
            let start = fmt_local(slot.start, &state.tz);
            let end = fmt_local(slot.end, &state.tz);
            debug!(client = %query.q, slot_start = slot.start, "slot assigned");
            SlotResponse {
                success: true,
                message: format!(
                    "The closest available time slot for {} is from {start} to {end}",
                    query.q
                ),
                slot_start: Some(start),
                slot_end: Some(end),
            }
        }
        Err(denial) => {
            debug!(client = %query.q, %denial, "request denied");
            SlotResponse {
                success: false,
                message: denial_message(&denial),
                slot_start: None,
                slot_end: None,
            }
        }
    };
    Json(response)
}

/// Human-facing denial text. `Denial`'s own Display stays diagnostic; the
/// wire keeps the original wording.
fn denial_message(denial: &Denial) -> String {
    match denial {
        Denial::RateLimited { client } => {
            format!("Please do not spam this service, {client}.")
        }
        Denial::Exhausted => "No more time slots available for today".to_string(),
    }
}

/// Format an instant as local 12-hour wall-clock time, e.g. "09:02 AM".
fn fmt_local(t: Ms, tz: &Tz) -> String {
    chrono::Utc
        .timestamp_millis_opt(t)
        .single()
        .map(|utc| utc.with_timezone(tz).format("%I:%M %p").to_string())
        .unwrap_or_else(|| t.to_string())
}
