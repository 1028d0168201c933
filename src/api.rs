//! HTTP surface for Cramkit.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /ingest` – Extract, chunk, embed, and persist an uploaded document
//!   (bytes are base64 in the JSON body). Returns per-chunk outcome counts
//!   and a human-readable message.
//! - `POST /chat` – Stream a conversational answer grounded in the subject's
//!   material as a plain-text chunked body.
//! - `POST /unit-prep` – Generate (or replay from cache) a unit study
//!   summary.
//! - `POST /answer` – Answer one exam-style question for a fixed mark weight.
//! - `POST /exam-prep` – Stream a generated mid/semester exam paper.
//! - `POST /study-plan` – Generate one unit of the parameterized study plan
//!   as structured JSON.
//! - `GET /metrics` – Observe ingestion counters.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::extract::ExtractError;
use crate::generation::{ChatMessage, DeltaStream};
use crate::metrics::MetricsSnapshot;
use crate::prompt::ExamKind;
use crate::prompt::directives::PlanDirectives;
use crate::service::{DocumentUpload, PrepService, ServiceError, StudyPlan, UnitPrepOutcome};

/// Build the HTTP router exposing the ingestion and query surface.
pub fn create_router(service: Arc<PrepService>) -> Router {
    Router::new()
        .route("/ingest", post(ingest_document))
        .route("/chat", post(chat))
        .route("/unit-prep", post(unit_prep))
        .route("/answer", post(answer_question))
        .route("/exam-prep", post(exam_prep))
        .route("/study-plan", post(study_plan))
        .route("/metrics", get(get_metrics))
        .with_state(service)
}

/// Request body for `POST /ingest`.
#[derive(Deserialize)]
struct IngestRequest {
    /// Subject scope the document belongs to.
    subject_id: String,
    /// Original filename, used for format dispatch.
    filename: String,
    /// Declared MIME type, if known.
    #[serde(default)]
    content_type: Option<String>,
    /// Base64-encoded document bytes.
    data: String,
}

/// Success response for `POST /ingest`.
#[derive(Serialize)]
struct IngestResponse {
    success: bool,
    chunks_total: usize,
    chunks_succeeded: usize,
    message: String,
}

async fn ingest_document(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let bytes = BASE64
        .decode(request.data.as_bytes())
        .map_err(|_| AppError::BadRequest("Document payload is not valid base64".into()))?;

    let filename = request.filename.clone();
    let report = service
        .ingest_document(DocumentUpload {
            subject_id: request.subject_id,
            filename: request.filename,
            content_type: request.content_type,
            bytes,
        })
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        chunks_total: report.chunks_total,
        chunks_succeeded: report.chunks_succeeded,
        message: format!(
            "Processed {} of {} chunks from {filename}",
            report.chunks_succeeded, report.chunks_total
        ),
    }))
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    /// Ordered conversation history; the last entry is the active query.
    messages: Vec<ChatMessage>,
    /// Optional subject scope for retrieval.
    #[serde(default)]
    subject_id: Option<String>,
}

async fn chat(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let stream = service
        .chat_stream(request.messages, request.subject_id.as_deref())
        .await?;
    Ok(text_stream_response(stream))
}

/// Request body for `POST /unit-prep`.
#[derive(Deserialize)]
struct UnitPrepRequest {
    /// Unit name to summarize, also the cache key.
    unit: String,
    #[serde(default)]
    subject_id: Option<String>,
}

async fn unit_prep(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<UnitPrepRequest>,
) -> Result<Json<UnitPrepOutcome>, AppError> {
    let outcome = service
        .unit_prep(&request.unit, request.subject_id.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// Request body for `POST /answer`.
#[derive(Deserialize)]
struct AnswerRequest {
    /// The literal exam question.
    question: String,
    /// Mark weight the answer should be sized for.
    marks: u32,
    #[serde(default)]
    subject_id: Option<String>,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn answer_question(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = service
        .answer_question(&request.question, request.marks, request.subject_id.as_deref())
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

/// Request body for `POST /exam-prep`.
#[derive(Deserialize)]
struct ExamPrepRequest {
    /// Paper variant to generate.
    exam_type: ExamKind,
    #[serde(default)]
    subject_id: Option<String>,
}

async fn exam_prep(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<ExamPrepRequest>,
) -> Result<Response, AppError> {
    let stream = service
        .exam_prep_stream(request.exam_type, request.subject_id.as_deref())
        .await?;
    Ok(text_stream_response(stream))
}

/// Request body for `POST /study-plan`.
#[derive(Deserialize)]
struct StudyPlanRequest {
    /// Subject scope; required because the plan covers a whole subject.
    subject_id: String,
    /// Directive axes plus the target unit index.
    #[serde(flatten)]
    directives: PlanDirectives,
}

async fn study_plan(
    State(service): State<Arc<PrepService>>,
    Json(request): Json<StudyPlanRequest>,
) -> Result<Json<StudyPlan>, AppError> {
    let plan = service
        .study_plan(&request.subject_id, &request.directives)
        .await?;
    Ok(Json(plan))
}

async fn get_metrics(State(service): State<Arc<PrepService>>) -> Json<MetricsSnapshot> {
    Json(service.metrics_snapshot())
}

/// Wrap a delta stream as a chunked plain-text response body.
///
/// Each delta is forwarded as it parses; a mid-stream provider failure
/// terminates the body so the client sees an interrupted transfer rather
/// than a silently truncated answer.
fn text_stream_response(stream: DeltaStream) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(stream))
        .expect("static response parts are valid")
}

/// Request-boundary error mapping.
enum AppError {
    /// Transport-level problem with the request itself.
    BadRequest(String),
    /// Pipeline failure bubbled up from the service.
    Service(ServiceError),
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self::Service(inner)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Service(error) => (status_for(error), error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Extract(ExtractError::OcrDisabled) => StatusCode::NOT_IMPLEMENTED,
        ServiceError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::NoSubject | ServiceError::NoContent => StatusCode::NOT_FOUND,
        ServiceError::Generation(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use crate::generation::GenerationError;
    use crate::store::StoreError;

    #[test]
    fn user_input_errors_map_to_unprocessable() {
        assert_eq!(
            status_for(&ServiceError::Extract(ExtractError::UnsupportedFormat)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServiceError::Extract(ExtractError::EmptyExtraction)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn provider_errors_map_to_bad_gateway() {
        assert_eq!(
            status_for(&ServiceError::Generation(GenerationError::Failed(
                "down".into()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ServiceError::Generation(GenerationError::MalformedOutput(
                "bad schema".into()
            ))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn store_errors_stay_internal() {
        assert_eq!(
            status_for(&ServiceError::Store(StoreError::InvalidUrl("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_scope_maps_to_not_found() {
        assert_eq!(status_for(&ServiceError::NoSubject), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ServiceError::NoContent), StatusCode::NOT_FOUND);
    }
}
