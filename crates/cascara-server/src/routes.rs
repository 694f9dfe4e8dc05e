use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use cascara_core::AppError;
use cascara_core::job::{CreateJobRequest, JobMode, UrlStatus};
use cascara_core::traits::{JobStore, ResultStore, RuleStore, UrlStore};

use crate::auth::require_api_key;
use crate::dto::{
    ControlResponse, CreateJobBody, CreateJobResponse, HealthResponse, JobListResponse,
    JobResponse, ListJobsQuery, ListResultsQuery, ListUrlsQuery, LogsQuery, LogsResponse,
    ProgressResponse, ResultListResponse, ResultResponse, UrlListResponse, UrlResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/jobs", post(create_job))
        .route("/v1/jobs", get(list_jobs))
        .route("/v1/jobs/{id}", get(get_job))
        .route("/v1/jobs/{id}/start", post(start_job))
        .route("/v1/jobs/{id}/pause", post(pause_job))
        .route("/v1/jobs/{id}/stop", post(stop_job))
        .route("/v1/jobs/{id}/progress", get(get_progress))
        .route("/v1/jobs/{id}/logs", get(get_logs))
        .route("/v1/jobs/{id}/urls", get(list_urls))
        .route("/v1/jobs/{id}/results", get(list_results))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/jobs",
    request_body = CreateJobBody,
    responses(
        (status = 201, description = "Job created", body = CreateJobResponse),
        (status = 400, description = "Bad request", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateJobBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mode = match body.mode.as_deref() {
        Some(s) => s.parse::<JobMode>().map_err(AppError::Generic)?,
        None => JobMode::List,
    };

    let request = match body.settings {
        Some(settings) => CreateJobRequest::new(body.name, mode).with_settings(settings.into()),
        None => CreateJobRequest::new(body.name, mode),
    };

    let job = state.db.job_repo().create(&request).await?;

    let urls = if body.urls.is_empty() {
        Vec::new()
    } else {
        state.db.url_repo().add_urls(job.id, &body.urls).await?
    };

    let rules: Vec<_> = body.rules.into_iter().map(Into::into).collect();
    if !rules.is_empty() {
        state.db.rule_repo().set_rules(job.id, &rules).await?;
    }

    let response = CreateJobResponse {
        job_id: job.id,
        status: job.status.to_string(),
        url_count: urls.len(),
        rule_count: rules.len(),
    };

    Ok((StatusCode::CREATED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/jobs",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "List of jobs", body = JobListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = query
        .status
        .map(|s| s.parse().map_err(AppError::Generic))
        .transpose()?;

    let limit = query.limit.unwrap_or(20).min(100);
    let total = state.db.job_repo().count(status_filter).await?;
    let jobs = state.db.job_repo().list(status_filter, limit).await?;

    let response = JobListResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.job_repo().get(id).await?;

    match job {
        Some(job) => Ok(axum::Json(JobResponse::from(job)).into_response()),
        None => {
            let body = crate::dto::ErrorResponse {
                error: "not_found".to_string(),
                message: format!("Job not found: {id}"),
            };
            Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Job control
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/jobs/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Job run accepted", body = ControlResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Conflict", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn start_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.start(id).await?;

    let response = ControlResponse {
        job_id: id,
        action: "start".to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/jobs/{id}/pause",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Pause requested", body = ControlResponse),
        (status = 409, description = "Conflict", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.pause(id).await?;

    let response = ControlResponse {
        job_id: id,
        action: "pause".to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    post,
    path = "/v1/jobs/{id}/stop",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Stop requested", body = ControlResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Conflict", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn stop_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.stop(id).await?;

    let response = ControlResponse {
        job_id: id,
        action: "stop".to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

// ---------------------------------------------------------------------------
// Progress and logs
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/progress",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Progress counters", body = ProgressResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.orchestrator.progress(id).await?;
    Ok(axum::Json(ProgressResponse::from(progress)))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/logs",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        LogsQuery
    ),
    responses(
        (status = 200, description = "Log events after the cursor", body = LogsResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let min_level = query
        .level
        .map(|s| s.parse().map_err(AppError::Generic))
        .transpose()?;

    let since = query.since.unwrap_or(0);
    let logs = state.orchestrator.logs(id, since, min_level).await?;

    Ok(axum::Json(LogsResponse::from(logs)))
}

// ---------------------------------------------------------------------------
// URLs and results
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/urls",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ListUrlsQuery
    ),
    responses(
        (status = 200, description = "URL queue entries", body = UrlListResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListUrlsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.job_repo().get(id).await?.is_none() {
        let body = crate::dto::ErrorResponse {
            error: "not_found".to_string(),
            message: format!("Job not found: {id}"),
        };
        return Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response());
    }

    let status_filter = query
        .status
        .map(|s| s.parse().map_err(AppError::Generic))
        .transpose()?;

    let limit = query.limit.unwrap_or(50).min(500);
    let offset = query.offset.unwrap_or(0);
    let urls = state
        .db
        .url_repo()
        .list(id, status_filter, limit, offset)
        .await?;
    let counts = state.db.url_repo().counts(id).await?;
    let total = match status_filter {
        None => counts.total(),
        Some(UrlStatus::Pending) => counts.pending,
        Some(UrlStatus::Processing) => counts.processing,
        Some(UrlStatus::Completed) => counts.completed,
        Some(UrlStatus::Failed) => counts.failed,
        Some(UrlStatus::Skipped) => counts.skipped,
    };

    let response = UrlListResponse {
        urls: urls.into_iter().map(UrlResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/results",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ListResultsQuery
    ),
    responses(
        (status = 200, description = "Extracted records", body = ResultListResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListResultsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.job_repo().get(id).await?.is_none() {
        let body = crate::dto::ErrorResponse {
            error: "not_found".to_string(),
            message: format!("Job not found: {id}"),
        };
        return Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response());
    }

    let limit = query.limit.unwrap_or(50).min(500);
    let offset = query.offset.unwrap_or(0);
    let results = state.db.result_repo().list(id, limit, offset).await?;
    let total = state.db.result_repo().count(id).await?;

    let response = ResultListResponse {
        results: results.into_iter().map(ResultResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response).into_response())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(HealthResponse {
                status: "ok",
                database: "up",
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(HealthResponse {
                status: "degraded",
                database: "down",
            }),
        ),
    }
}
