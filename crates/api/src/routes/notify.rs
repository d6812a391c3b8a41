//! Notification Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::AppState;

/// Response for the notification test endpoint
#[derive(Debug, Serialize)]
pub struct NotifyTestResponse {
    pub status: String,
}

/// Send a test email to the configured report recipient
pub async fn send_test(State(state): State<Arc<AppState>>) -> Json<NotifyTestResponse> {
    let (Some(notifier), Some(recipient)) =
        (state.notifier.clone(), state.report_recipient.clone())
    else {
        return Json(NotifyTestResponse {
            status: "disabled".to_string(),
        });
    };

    let outcome = tokio::task::spawn_blocking(move || {
        notifier.send(
            &recipient,
            "Interview Completed",
            "Your interview session has been successfully recorded.",
        )
    })
    .await;

    let status = match outcome {
        Ok(Ok(())) => "sent",
        Ok(Err(e)) => {
            warn!("Test notification failed: {}", e);
            "failed"
        }
        Err(e) => {
            warn!("Test notification task failed: {}", e);
            "failed"
        }
    };

    Json(NotifyTestResponse {
        status: status.to_string(),
    })
}
