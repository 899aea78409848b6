use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use crate::Error;
use crate::query::SearchHit;
use crate::server::AppState;
use crate::storage::{DEFAULT_LIST_LIMIT, InventionRecord, InventionSummary};

static INVENTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^inv-\d{8}-\d{6}$").expect("valid invention id pattern"));

#[derive(Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub domain: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub invention_id: String,
    pub domain_key: String,
    pub url: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        Self { error: err.to_string() }
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnknownDomain(_) => StatusCode::NOT_FOUND,
        Error::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Provider { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn to_api_error(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    (status, Json(err.into()))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let page = state.engine.stats_page().await.map_err(to_api_error)?;
    let value = serde_json::to_value(&page)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(value))
}

pub async fn list_domains(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let domains = state.engine.domains().await.map_err(to_api_error)?;
    let value = serde_json::to_value(&domains)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(value))
}

pub async fn get_domain(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<serde_json::Value> {
    let page = state
        .engine
        .by_domain(&key, params.limit)
        .await
        .map_err(to_api_error)?;
    let value = serde_json::to_value(&page)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(value))
}

pub async fn list_inventions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<InventionSummary>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let inventions = state.engine.all(limit).await.map_err(to_api_error)?;
    Ok(Json(inventions))
}

pub async fn get_invention(
    State(state): State<Arc<AppState>>,
    Path((domain, id)): Path<(String, String)>,
) -> ApiResult<InventionRecord> {
    if !INVENTION_ID.is_match(&id) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Malformed invention id: {}", id),
        ));
    }

    match state.engine.by_id(&domain, &id).await.map_err(to_api_error)? {
        Some(record) => Ok(Json(record)),
        None => Err(api_error(StatusCode::NOT_FOUND, "Invention not found")),
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let results = state.engine.search(&params.q).await.map_err(to_api_error)?;
    Ok(Json(SearchResponse {
        query: params.q,
        results,
    }))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> std::result::Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let invention_id = state
        .engine
        .generate(&request.domain)
        .await
        .map_err(to_api_error)?;

    let url = format!("/api/inventions/{}/{}", request.domain, invention_id);
    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            invention_id,
            domain_key: request.domain,
            url,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::DomainRegistry;
    use crate::generator::Generator;
    use crate::generator::tests::ScriptedProvider;
    use crate::query::QueryEngine;
    use crate::server::router;
    use crate::storage::contract::{base_time, record};
    use crate::storage::{InventionStore, SqliteStore};
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_app(responses: Vec<crate::Result<String>>) -> (Router, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.init().await.unwrap();
        let generator = Generator::with_provider(Box::new(ScriptedProvider::new(responses)), store.clone())
            .with_clock(Arc::new(FixedClock(base_time())));
        let engine = QueryEngine::new(store.clone(), DomainRegistry::builtin()).with_generator(Arc::new(generator));
        (router(engine), store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let (app, _) = test_app(vec![]).await;
        let response = app.oneshot(get("/api/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["total_inventions"], 0);
        assert_eq!(json["recent_inventions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_domain_is_404() {
        let (app, _) = test_app(vec![]).await;
        let response = app.oneshot(get("/api/domains/alchemy")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("alchemy"));
    }

    #[tokio::test]
    async fn test_get_invention() {
        let (app, store) = test_app(vec![]).await;
        store
            .save(&record("inv-20250110-120000", "biotechnology", "TITLE: Enzyme", base_time()))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(get("/api/inventions/biotechnology/inv-20250110-120000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "Enzyme");

        let response = app
            .clone()
            .oneshot(get("/api/inventions/medical-devices/inv-20250110-120000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/api/inventions/biotechnology/not-an-id")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_returns_context() {
        let (app, store) = test_app(vec![]).await;
        store
            .save(&record("inv-20250110-120000", "materials-science", "TITLE: Foam\nPolymer lattice", base_time()))
            .await
            .unwrap();

        let response = app.oneshot(get("/api/search?q=polymer")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["query"], "polymer");
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0]["context"].as_str().unwrap().contains("Polymer"));
    }

    #[tokio::test]
    async fn test_generate_creates_invention() {
        let (app, store) = test_app(vec![Ok("TITLE: Seed Drill".to_string())]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"domain":"agricultural-technology"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["invention_id"], "inv-20250110-120000");
        assert_eq!(store.count_by_domain("agricultural-technology").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generate_failure_surfaces_message() {
        let (app, _) = test_app(vec![Err(Error::provider("scripted", "rate limited"))]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"domain":"biotechnology"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("rate limited"));
    }
}
