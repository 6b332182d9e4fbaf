//! HTTP routes and request/response types.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use cadrag_library::{CommandEntry, SourceKind};
use cadrag_retrieval::{RebuildOutcome, SearchHit};

use crate::error::Result;
use crate::service::{RetrievalService, SearchOutcome};
use crate::store::UserCodeRecord;

/// Build the application router.
pub fn router(service: Arc<RetrievalService>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/rebuild", post(rebuild))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/commands", get(list_commands))
        .route("/user-entries", get(list_user_entries).post(create_user_entry))
        .route(
            "/user-entries/{id}",
            get(get_user_entry).delete(delete_user_entry),
        )
        .route("/user-entries/preview", post(preview_user_entry))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    requirement: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    matched: bool,
    results: Vec<ResultDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultDto {
    command: String,
    description: String,
    alias: String,
    source_kind: SourceKind,
    similarity: f32,
}

impl From<SearchHit> for ResultDto {
    fn from(hit: SearchHit) -> Self {
        Self {
            command: hit.entry.name,
            description: hit.entry.description,
            alias: hit.entry.alias,
            source_kind: hit.entry.source_kind,
            similarity: hit.score,
        }
    }
}

async fn query(
    State(service): State<Arc<RetrievalService>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = match service.search(&request.requirement, request.top_k).await? {
        SearchOutcome::Ready(hits) => QueryResponse {
            matched: !hits.is_empty(),
            results: hits.into_iter().map(ResultDto::from).collect(),
            reason: None,
        },
        SearchOutcome::Unavailable(reason) => QueryResponse {
            matched: false,
            results: Vec::new(),
            reason: Some(reason.to_string()),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RebuildResponse {
    success: bool,
    entry_count: usize,
}

async fn rebuild(State(service): State<Arc<RetrievalService>>) -> Result<Json<RebuildResponse>> {
    let entry_count = match service.rebuild().await? {
        RebuildOutcome::Completed(stats) => stats.entry_count,
        // Coalesced into an in-flight rebuild; report the current count.
        RebuildOutcome::Coalesced => service.stats().entry_count,
    };
    Ok(Json(RebuildResponse {
        success: true,
        entry_count,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    ready: bool,
    total_commands: usize,
    per_source_counts: PerSourceCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PerSourceCounts {
    builtin: usize,
    extension: usize,
    user: usize,
}

async fn stats(State(service): State<Arc<RetrievalService>>) -> Json<StatsResponse> {
    let stats = service.stats();
    Json(StatsResponse {
        ready: stats.ready,
        total_commands: stats.entry_count,
        per_source_counts: PerSourceCounts {
            builtin: stats.counts.builtin,
            extension: stats.counts.extension,
            user: stats.counts.user,
        },
        dimension: stats.dimension,
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandDto {
    command: String,
    description: String,
    alias: String,
    source_kind: SourceKind,
}

impl From<CommandEntry> for CommandDto {
    fn from(entry: CommandEntry) -> Self {
        Self {
            command: entry.name,
            description: entry.description,
            alias: entry.alias,
            source_kind: entry.source_kind,
        }
    }
}

async fn list_commands(State(service): State<Arc<RetrievalService>>) -> Json<Vec<CommandDto>> {
    Json(
        service
            .list_commands()
            .into_iter()
            .map(CommandDto::from)
            .collect(),
    )
}

async fn list_user_entries(
    State(service): State<Arc<RetrievalService>>,
) -> Result<Json<Vec<UserCodeRecord>>> {
    Ok(Json(service.list_user_codes().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserEntryRequest {
    command: String,
    description: String,
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserEntryResponse {
    success: bool,
    id: String,
}

async fn create_user_entry(
    State(service): State<Arc<RetrievalService>>,
    Json(request): Json<CreateUserEntryRequest>,
) -> Result<(StatusCode, Json<CreateUserEntryResponse>)> {
    let record = service
        .create_user_code(&request.command, &request.description, &request.code)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserEntryResponse {
            success: true,
            id: record.id,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserEntryDetail {
    #[serde(flatten)]
    record: UserCodeRecord,
    code: String,
}

async fn get_user_entry(
    State(service): State<Arc<RetrievalService>>,
    Path(id): Path<String>,
) -> Result<Json<UserEntryDetail>> {
    let (record, code) = service.get_user_code(&id).await?;
    Ok(Json(UserEntryDetail { record, code }))
}

async fn delete_user_entry(
    State(service): State<Arc<RetrievalService>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    service.delete_user_code(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    command: Option<String>,
}

async fn preview_user_entry(
    State(service): State<Arc<RetrievalService>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>> {
    let command = service.preview_command(&request.code)?;
    Ok(Json(PreviewResponse { command }))
}
