use crate::http::{
    ApiError, AppState, CompanyDownloadRequest, DownloadRequest, FilesQuery, HealthResponse, PolicyInput,
    RunAccepted,
};
use crate::models::Policy;
use crate::services::find_files;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use std::collections::HashMap;
use std::time::SystemTime;
use uuid::Uuid;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/companies", get(list_companies_handler))
        .route("/api/v1/downloads", post(download_all_handler))
        .route("/api/v1/downloads/:key", post(download_company_handler).get(run_status_handler))
        .route("/api/v1/policies/:company/:number/files", get(policy_files_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let response = HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response))
}

async fn list_companies_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.registry.get_companies_info()))
}

/// Validates the company and converts the rows before anything is spawned,
/// so a bad request never opens a browser.
fn prepare_batch(state: &AppState, company: &str, inputs: Vec<PolicyInput>) -> Result<(String, Vec<Policy>), ApiError> {
    let company_config = state
        .registry
        .company(company)
        .ok_or_else(|| ApiError::NotFound(format!("compañía {}", company)))?;
    if !company_config.has_credentials() {
        return Err(ApiError::CompanyInactive(company_config.name.clone()));
    }
    if inputs.is_empty() {
        return Err(ApiError::BadRequest(format!("{}: lista de pólizas vacía", company_config.name)));
    }

    let name = company_config.name.clone();
    let policies = inputs
        .into_iter()
        .map(|input| input.into_policy(&name))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::BadRequest)?;
    Ok((name, policies))
}

async fn spawn_run(state: AppState, batches: HashMap<String, Vec<Policy>>) -> Uuid {
    let run_id = state.runs.start().await;
    tracing::info!("📥 Corrida {} aceptada ({} compañías)", run_id, batches.len());

    tokio::spawn(async move {
        let runner = state.runner.clone();
        match tokio::spawn(async move { runner.run_all(batches).await }).await {
            Ok(results) => state.runs.complete(run_id, results).await,
            Err(e) => {
                tracing::error!("❌ Corrida {} abortada: {}", run_id, e);
                state.runs.fail(run_id, format!("la corrida terminó inesperadamente: {}", e)).await;
            }
        }
        state.runs.cleanup_expired().await;
        tracing::info!("🏁 Corrida {} terminada", run_id);
    });
    run_id
}

async fn download_company_handler(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Json(request): Json<CompanyDownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, policies) = prepare_batch(&state, &company, request.policies)?;
    let run_id = spawn_run(state, HashMap::from([(name, policies)])).await;
    Ok((StatusCode::ACCEPTED, Json(RunAccepted { run_id })))
}

async fn download_all_handler(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.batches.is_empty() {
        return Err(ApiError::BadRequest("no hay lotes para descargar".to_string()));
    }

    let mut batches = HashMap::new();
    for (company, inputs) in request.batches {
        let (name, policies) = prepare_batch(&state, &company, inputs)?;
        batches.entry(name).or_insert_with(Vec::new).extend(policies);
    }

    let run_id = spawn_run(state, batches).await;
    Ok((StatusCode::ACCEPTED, Json(RunAccepted { run_id })))
}

async fn run_status_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = Uuid::parse_str(&key).map_err(|_| ApiError::BadRequest(format!("id de corrida inválido: {}", key)))?;
    let record = state
        .runs
        .get(&run_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("corrida {}", run_id)))?;
    Ok((StatusCode::OK, Json(record)))
}

async fn policy_files_handler(
    State(state): State<AppState>,
    Path((company, number)): Path<(String, String)>,
    Query(query): Query<FilesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = find_files(
        state.store.as_ref(),
        &company,
        &number,
        query.plate.as_deref(),
        query.mercosur,
        Local::now().date_naive(),
    )
    .await?;
    Ok((StatusCode::OK, Json(lookup)))
}
