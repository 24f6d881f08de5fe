//! Route handlers. Field names on the wire are camelCase.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderName;
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use curator_core::CuratorError;
use curator_core::types::Graph;
use curator_core::workspace::{BatchRef, validate_id};

use crate::AppState;
use crate::errors::ApiError;

type ApiResult = Result<Json<Value>, ApiError>;

// ── Request shapes ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchParams {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

impl BatchParams {
    fn batch(self) -> Result<BatchRef, ApiError> {
        match (self.project_id, self.batch_id) {
            (Some(project), Some(batch)) => Ok(BatchRef::new(project, batch)?),
            _ => Err(ApiError::BadRequest("Missing projectId or batchId".into())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParams {
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ProjectParams {
    fn project(self) -> Result<String, ApiError> {
        let project = self
            .project_id
            .ok_or_else(|| ApiError::BadRequest("Missing projectId".into()))?;
        validate_id("projectId", &project)?;
        Ok(project)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(flatten)]
    pub target: BatchParams,
    #[serde(default, alias = "kgCandidateDataState")]
    pub candidate_graph: Option<Graph>,
    #[serde(default, alias = "commentMessage")]
    pub comment: String,
}

/// The console sent party numbers both as numbers and as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PartyNumber {
    Number(i64),
    Text(String),
}

impl PartyNumber {
    fn to_index(&self) -> Result<usize, ApiError> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| CuratorError::Validation(format!("invalid party number {s:?}")))?,
        };
        usize::try_from(n)
            .map_err(|_| ApiError::from(CuratorError::Validation(format!("invalid party number {n}"))))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(flatten)]
    pub target: BatchParams,
    pub party_number: Option<PartyNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    #[serde(default, alias = "commitHash")]
    pub commit_id: Option<String>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn no_cache_headers() -> [(HeaderName, &'static str); 4] {
    [
        (CACHE_CONTROL, "no-store, no-cache, must-revalidate, proxy-revalidate"),
        (PRAGMA, "no-cache"),
        (EXPIRES, "0"),
        (HeaderName::from_static("surrogate-control"), "no-store"),
    ]
}

// ── Reads ──────────────────────────────────────────────────────────

/// `GET /graph-data?projectId&batchId`
pub async fn graph_data(
    State(state): State<Arc<AppState>>,
    params: Result<Query<BatchParams>, QueryRejection>,
) -> impl IntoResponse {
    (no_cache_headers(), candidate_data(&state, params))
}

fn candidate_data(state: &AppState, params: Result<Query<BatchParams>, QueryRejection>) -> ApiResult {
    let batch = query(params)?.batch()?;
    let graph = state.service.candidate_graph(&batch)?;
    Ok(Json(json!({ "success": true, "kgCandidateData": graph })))
}

/// `GET /batch?projectId&batchId`
pub async fn batch_view(
    State(state): State<Arc<AppState>>,
    params: Result<Query<BatchParams>, QueryRejection>,
) -> ApiResult {
    let batch = query(params)?.batch()?;
    let view = state.service.batch_view(&batch)?;
    let mut value = json!(view);
    value["success"] = json!(true);
    Ok(Json(value))
}

/// `GET /projects`
pub async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult {
    let projects = state.service.list_projects()?;
    Ok(Json(json!({ "success": true, "projects": projects })))
}

/// `GET /batches?projectId`
pub async fn list_batches(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ProjectParams>, QueryRejection>,
) -> ApiResult {
    let project = query(params)?.project()?;
    let batches = state.service.list_batches(&project)?;
    Ok(Json(json!({ "success": true, "batches": batches })))
}

/// `GET /merged-graph?projectId`
pub async fn merged_graph(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ProjectParams>, QueryRejection>,
) -> ApiResult {
    let project = query(params)?.project()?;
    let graph = state.service.merged_graph(&project)?;
    let mut value = json!(graph);
    value["success"] = json!(true);
    Ok(Json(value))
}

/// `GET /commits`
pub async fn list_commits(State(state): State<Arc<AppState>>) -> ApiResult {
    let commits = state.service.list_versions().await?;
    Ok(Json(json!({ "success": true, "commits": commits })))
}

// ── Mutations ──────────────────────────────────────────────────────

/// `POST /generate-candidate {projectId, batchId}`
pub async fn generate_candidate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchParams>, JsonRejection>,
) -> ApiResult {
    let batch = body(payload)?.batch()?;
    let _guard = state.in_flight.acquire(format!("generate:{batch}"))?;
    let outcome = state.service.generate_candidate(&batch).await?;
    info!(batch = %batch, duration = ?outcome.duration, "Candidate generated");
    Ok(Json(json!({ "success": true })))
}

/// `POST /publish {projectId, batchId, candidateGraph, comment}`
pub async fn publish(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResult {
    let request = body(payload)?;
    let batch = request.target.batch()?;
    let candidate = request
        .candidate_graph
        .ok_or_else(|| ApiError::BadRequest("Missing candidateGraph".into()))?;

    let _guard = state.in_flight.acquire(format!("publish:{batch}"))?;
    let receipt = state
        .service
        .publish(&batch, &candidate, &request.comment)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Batch published, graph saved, and commit recorded.",
        "commitId": receipt.commit_id,
        "staged": receipt.staged,
    })))
}

/// `POST /update-review-status {projectId, batchId, partyNumber}`
pub async fn update_review_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult {
    let request = body(payload)?;
    let batch = request.target.batch()?;
    let party = request
        .party_number
        .ok_or_else(|| ApiError::BadRequest("Missing partyNumber".into()))?
        .to_index()?;
    let metadata = state.service.update_review_status(&batch, party)?;
    Ok(Json(json!({
        "success": true,
        "message": "Review status updated successfully.",
        "isReviewed": metadata.is_reviewed,
    })))
}

/// `POST /rollback {commitId}`
pub async fn rollback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RollbackRequest>, JsonRejection>,
) -> ApiResult {
    let commit_id = body(payload)?
        .commit_id
        .ok_or_else(|| ApiError::BadRequest("Missing commitId".into()))?;
    let _guard = state.in_flight.acquire("checkout")?;
    let restored = state.service.rollback(&commit_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Rolled back to commit successfully.",
        "reference": restored.reference,
        "reloadRequired": restored.reload_required,
    })))
}

/// `POST /reset-latest`
pub async fn reset_latest(State(state): State<Arc<AppState>>) -> ApiResult {
    let _guard = state.in_flight.acquire("checkout")?;
    let restored = state.service.reset_to_latest().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Reset to latest commit successfully.",
        "reference": restored.reference,
        "reloadRequired": restored.reload_required,
    })))
}
