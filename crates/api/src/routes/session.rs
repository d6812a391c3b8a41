//! Session Routes
//!
//! Lifecycle endpoints for interview sessions: start, frame ingest,
//! status, end.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use behavior::{BehaviorAnalyzer, BehaviorError, BehaviorReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use session_store::{InterviewSession, SessionRecord, SessionStatus};
use std::sync::{Arc, PoisonError};
use tracing::{error, info, warn};

use crate::AppState;

/// Query parameters identifying a candidate's session
#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    pub candidate_id: String,
}

/// Query parameters for frame ingest
#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    pub candidate_id: String,
    /// Frame sequence number assigned by the client
    #[serde(default)]
    pub sequence: u32,
    /// Capture timestamp, milliseconds since session start
    #[serde(default)]
    pub timestamp_ms: u64,
}

/// Response wrapping a session record
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub session: SessionRecord,
}

/// Response for session end, carrying the final report
#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub message: String,
    pub session: SessionRecord,
    pub report: BehaviorReport,
}

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_analyzed: Option<u64>,
}

/// Error payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Start a new interview session for a candidate
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandidateQuery>,
) -> Response {
    let provider = match (state.provider_factory)() {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to construct landmark provider: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let analyzer = BehaviorAnalyzer::with_provider(state.behavior_config.clone(), provider);
    let session = InterviewSession::new(params.candidate_id.clone(), analyzer);
    let record = session.record.clone();

    match state.repository.put(session) {
        Ok(_) => {
            info!(
                "Session {} started for candidate {}",
                record.session_id, record.candidate_id
            );
            (
                StatusCode::CREATED,
                Json(SessionResponse {
                    message: "Session started".to_string(),
                    session: record,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Feed one JPEG-encoded frame into the candidate's session.
///
/// Analysis runs on the blocking pool: the per-session lock serializes
/// frames against one analyzer, and detector inference may stall for the
/// model's latency.
pub async fn ingest_frame(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FrameQuery>,
    body: Bytes,
) -> Response {
    let Some(handle) = state.repository.get(&params.candidate_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No active session for candidate {}", params.candidate_id),
        );
    };

    let frame = match video_frame::decode_jpeg(&body, params.timestamp_ms, params.sequence) {
        Ok(frame) => frame,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    let analysis = tokio::task::spawn_blocking(move || {
        let mut session = handle.lock().unwrap_or_else(PoisonError::into_inner);
        session.analyzer.analyze(&frame)
    })
    .await;

    match analysis {
        Ok(Ok(analysis)) => (StatusCode::OK, Json(analysis)).into_response(),
        Ok(Err(BehaviorError::InvalidFrame(e))) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Ok(Err(e)) => {
            warn!(
                "Frame analysis failed for candidate {}: {}",
                params.candidate_id, e
            );
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e) => {
            error!("Frame analysis task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "analysis task failed")
        }
    }
}

/// Check session status for a candidate
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandidateQuery>,
) -> Json<StatusResponse> {
    match state.repository.get(&params.candidate_id) {
        Some(handle) => {
            let session = handle.lock().unwrap_or_else(PoisonError::into_inner);
            Json(StatusResponse {
                status: "active".to_string(),
                started_at: Some(session.record.started_at),
                frames_analyzed: Some(session.analyzer.state().frames_analyzed()),
            })
        }
        None => Json(StatusResponse {
            status: "no active session".to_string(),
            started_at: None,
            frames_analyzed: None,
        }),
    }
}

/// Generate a partial report for a still-active session
pub async fn session_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandidateQuery>,
) -> Response {
    let Some(handle) = state.repository.get(&params.candidate_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No active session for candidate {}", params.candidate_id),
        );
    };

    let report = {
        let session = handle.lock().unwrap_or_else(PoisonError::into_inner);
        session.analyzer.report()
    };

    (StatusCode::OK, Json(report)).into_response()
}

/// End an active session, returning the final behavior report
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandidateQuery>,
) -> Response {
    let Some(handle) = state.repository.remove(&params.candidate_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No active session for candidate {}", params.candidate_id),
        );
    };

    let (record, report) = {
        let mut session = handle.lock().unwrap_or_else(PoisonError::into_inner);
        session.record.status = SessionStatus::Completed;
        (session.record.clone(), session.analyzer.report())
    };

    info!(
        "Session {} ended after {} frames (flagged: {})",
        record.session_id, report.frames_analyzed, report.behavior_flag
    );

    // Report delivery happens off the request path; a failed email never
    // fails the session end.
    if let (Some(notifier), Some(recipient)) =
        (state.notifier.clone(), state.report_recipient.clone())
    {
        let candidate_id = record.candidate_id.clone();
        let report_copy = report.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = notifier.send_report(&recipient, &candidate_id, &report_copy) {
                warn!("Report notification for {} failed: {}", candidate_id, e);
            }
        });
    }

    (
        StatusCode::OK,
        Json(EndSessionResponse {
            message: "Session ended".to_string(),
            session: record,
            report,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::{create_router, AppState, ProviderFactory, Settings};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use behavior::{LandmarkProvider, LandmarkSet, ScriptedProvider};
    use std::io::Cursor;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn scripted_state(script: Vec<Vec<LandmarkSet>>) -> Arc<AppState> {
        let factory: ProviderFactory = Arc::new(move || {
            Ok(Box::new(ScriptedProvider::new(script.clone()))
                as Box<dyn LandmarkProvider + Send>)
        });
        Arc::new(AppState::with_provider_factory(&Settings::default(), factory))
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn jpeg_frame() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([90, 120, 150]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = create_router(scripted_state(Vec::new()));

        let started = app
            .clone()
            .oneshot(post("/api/v1/session/start?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(started.status(), StatusCode::CREATED);

        let duplicate = app
            .clone()
            .oneshot(post("/api/v1/session/start?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

        let status = app
            .clone()
            .oneshot(get("/api/v1/session/status?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        assert_eq!(body_json(status).await["status"], "active");

        let partial = app
            .clone()
            .oneshot(get("/api/v1/session/report?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(partial.status(), StatusCode::OK);
        assert_eq!(body_json(partial).await["frames_analyzed"], 0);

        let ended = app
            .clone()
            .oneshot(post("/api/v1/session/end?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(ended.status(), StatusCode::OK);
        let json = body_json(ended).await;
        assert_eq!(json["report"]["frames_analyzed"], 0);
        assert_eq!(json["report"]["behavior_flag"], false);

        let gone = app
            .clone()
            .oneshot(get("/api/v1/session/status?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(body_json(gone).await["status"], "no active session");

        let end_again = app
            .oneshot(post("/api/v1/session/end?candidate_id=cand-1"))
            .await
            .unwrap();
        assert_eq!(end_again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_frame_ingest() {
        let app = create_router(scripted_state(vec![vec![LandmarkSet::synthetic_face(
            0.16, 0.12,
        )]]));

        app.clone()
            .oneshot(post("/api/v1/session/start?candidate_id=cand-2"))
            .await
            .unwrap();

        let analyzed = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/session/frames?candidate_id=cand-2&sequence=1")
                    .body(Body::from(jpeg_frame()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(analyzed.status(), StatusCode::OK);
        let json = body_json(analyzed).await;
        assert_eq!(json["classification"], "single_face");
        assert_eq!(json["looking_away"], false);

        let garbage = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/session/frames?candidate_id=cand-2")
                    .body(Body::from(vec![0u8, 1, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let orphan = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/session/frames?candidate_id=nobody")
                    .body(Body::from(jpeg_frame()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(orphan.status(), StatusCode::NOT_FOUND);
    }
}
