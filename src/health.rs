use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::AppState;

pub async fn health_check_handler(State(state): State<AppState>) -> Response {
    tracing::trace!("health_check started");

    match state.store.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "database connection is healthy"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("health_check failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": format!("database check failed: {}", e)
                })),
            )
                .into_response()
        }
    }
}
