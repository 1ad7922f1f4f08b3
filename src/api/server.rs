//! HTTP API server for tenants, learners, lessons and feedback

use crate::error::LearnPalError;
use crate::tutor::Tutor;
use crate::types::{Learner, NewFeedback, NewLearner, Plan, ProgressSummary, ReplyTier, Tenant};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

/// Header carrying the caller's tenant, set by the upstream auth layer
pub const TENANT_HEADER: &str = "x-tenant-id";

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8000).into(),
        }
    }
}

/// API server state
#[derive(Clone)]
pub struct AppState {
    tutor: Arc<Tutor>,
    instance_id: String,
}

impl AppState {
    pub fn new(tutor: Arc<Tutor>) -> Self {
        Self {
            tutor,
            instance_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        }
    }
}

/// Error body returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LearnPalError> for ApiError {
    fn from(err: LearnPalError) -> Self {
        let status = match &err {
            LearnPalError::LearnerNotFound(_) | LearnPalError::ConceptNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            LearnPalError::Forbidden(_) => StatusCode::FORBIDDEN,
            LearnPalError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => {
                warn!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create new API server
    pub fn new(config: ApiServerConfig, tutor: Arc<Tutor>) -> Self {
        Self {
            config,
            state: AppState::new(tutor),
        }
    }

    /// Build router
    pub fn build_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ])
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_handler))
            .route("/tenants", post(create_tenant_handler))
            .route(
                "/learners",
                get(list_learners_handler).post(create_learner_handler),
            )
            .route("/progress/:learner_id", get(progress_handler))
            .route("/lesson", post(lesson_handler))
            .route("/feedback", post(feedback_handler))
            .with_state(state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Start server
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;

        info!(
            "API server [{}] listening on http://{}",
            self.state.instance_id, self.config.addr
        );

        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Resolve the caller's tenant from the request headers
fn tenant_scope(headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Missing or invalid tenant"))
}

/// Load a learner and make sure it belongs to `tenant_id`
async fn owned_learner(state: &AppState, tenant_id: i64, learner_id: i64) -> Result<Learner, ApiError> {
    match state.tutor.store().get_learner(learner_id).await? {
        Some(learner) if learner.tenant_id == tenant_id => Ok(learner),
        _ => {
            debug!("Tenant {} denied access to learner {}", tenant_id, learner_id);
            Err(ApiError::new(StatusCode::FORBIDDEN, "Forbidden"))
        }
    }
}

/// Health check handler
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    name: String,
    #[serde(default)]
    plan: Option<Plan>,
}

async fn create_tenant_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<Tenant>), ApiError> {
    let tenant = state
        .tutor
        .store()
        .create_tenant(&req.name, req.plan.unwrap_or(Plan::Free))
        .await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn create_learner_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewLearner>,
) -> Result<(StatusCode, Json<Learner>), ApiError> {
    let tenant_id = tenant_scope(&headers)?;
    let learner = state.tutor.store().create_learner(tenant_id, &req).await?;
    Ok((StatusCode::CREATED, Json(learner)))
}

async fn list_learners_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Learner>>, ApiError> {
    let tenant_id = tenant_scope(&headers)?;
    let learners = state.tutor.store().list_learners(tenant_id).await?;
    Ok(Json(learners))
}

async fn progress_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(learner_id): Path<i64>,
) -> Result<Json<BTreeMap<String, ProgressSummary>>, ApiError> {
    let tenant_id = tenant_scope(&headers)?;
    owned_learner(&state, tenant_id, learner_id).await?;
    let report = state.tutor.store().progress_report(learner_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct LessonRequest {
    learner_id: i64,
    user_text: String,
}

#[derive(Debug, Serialize)]
pub struct LessonResponse {
    #[serde(rename = "type")]
    tier: ReplyTier,
    content: String,
    /// Same text as `content`, kept for older clients
    reply: String,
    latency_ms: u64,
    correct: bool,
}

async fn lesson_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LessonRequest>,
) -> Result<Json<LessonResponse>, ApiError> {
    let tenant_id = tenant_scope(&headers)?;
    owned_learner(&state, tenant_id, req.learner_id).await?;

    let reply = state.tutor.reply(req.learner_id, &req.user_text).await?;
    Ok(Json(LessonResponse {
        tier: reply.tier,
        reply: reply.content.clone(),
        content: reply.content,
        latency_ms: reply.latency_ms,
        correct: reply.correct,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

async fn feedback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewFeedback>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let tenant_id = tenant_scope(&headers)?;
    owned_learner(&state, tenant_id, req.learner_id).await?;
    state.tutor.store().record_feedback(&req).await?;
    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "ok".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LlmConfig, OpenAiGenerator};
    use crate::storage::sqlite::SqliteStore;
    use crate::tutor::{HintTierController, NOT_CONFIGURED_REPLY};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("api.db")).await.unwrap();
        let generator = OpenAiGenerator::new(LlmConfig {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            max_tokens: 150,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let tutor = Tutor::new(
            Arc::new(store),
            Arc::new(HintTierController::new(100)),
            Arc::new(generator),
        );
        (AppState::new(Arc::new(tutor)), dir)
    }

    fn tenant_headers(tenant_id: i64) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from(tenant_id));
        headers
    }

    async fn create_tenant(state: &AppState, name: &str) -> Tenant {
        let (status, Json(tenant)) = create_tenant_handler(
            State(state.clone()),
            Json(CreateTenantRequest {
                name: name.to_string(),
                plan: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        tenant
    }

    async fn create_learner(state: &AppState, tenant_id: i64) -> Learner {
        let (status, Json(learner)) = create_learner_handler(
            State(state.clone()),
            tenant_headers(tenant_id),
            Json(NewLearner {
                name: "Kid".to_string(),
                dob: "2018-01".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        learner
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _dir) = test_state().await;
        let instance_id = state.instance_id.clone();

        let response = health_handler(State(state)).await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.instance_id, instance_id);
    }

    #[tokio::test]
    async fn test_learners_scoped_to_tenant() {
        let (state, _dir) = test_state().await;
        let smith = create_tenant(&state, "Family Smith").await;
        let jones = create_tenant(&state, "Family Jones").await;

        let Json(empty) = list_learners_handler(State(state.clone()), tenant_headers(smith.id))
            .await
            .unwrap();
        assert!(empty.is_empty());

        let learner = create_learner(&state, smith.id).await;
        let Json(listed) = list_learners_handler(State(state.clone()), tenant_headers(smith.id))
            .await
            .unwrap();
        assert_eq!(listed, vec![learner]);

        let Json(other) = list_learners_handler(State(state), tenant_headers(jones.id))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_missing_tenant_header_rejected() {
        let (state, _dir) = test_state().await;
        let err = list_learners_handler(State(state), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_lesson_and_progress() {
        let (state, _dir) = test_state().await;
        let tenant = create_tenant(&state, "T").await;
        let learner = create_learner(&state, tenant.id).await;

        for _ in 0..2 {
            let Json(reply) = lesson_handler(
                State(state.clone()),
                tenant_headers(tenant.id),
                Json(LessonRequest {
                    learner_id: learner.id,
                    user_text: "+".to_string(),
                }),
            )
            .await
            .unwrap();
            assert_eq!(reply.reply, NOT_CONFIGURED_REPLY);
            assert_eq!(reply.content, reply.reply);
        }

        let Json(report) = progress_handler(
            State(state),
            tenant_headers(tenant.id),
            Path(learner.id),
        )
        .await
        .unwrap();
        let summary = report.get("addition within 10").unwrap();
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.correct, 0);
    }

    #[tokio::test]
    async fn test_lesson_response_shape() {
        let response = LessonResponse {
            tier: ReplyTier::Hint,
            content: "Try counting up".to_string(),
            reply: "Try counting up".to_string(),
            latency_ms: 12,
            correct: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "hint");
        assert_eq!(json["reply"], "Try counting up");
    }

    #[tokio::test]
    async fn test_cross_tenant_access_forbidden() {
        let (state, _dir) = test_state().await;
        let owner = create_tenant(&state, "Owner").await;
        let intruder = create_tenant(&state, "Intruder").await;
        let learner = create_learner(&state, owner.id).await;

        let err = lesson_handler(
            State(state.clone()),
            tenant_headers(intruder.id),
            Json(LessonRequest {
                learner_id: learner.id,
                user_text: "7".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = progress_handler(State(state), tenant_headers(intruder.id), Path(learner.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_feedback_rating_validated() {
        let (state, _dir) = test_state().await;
        let tenant = create_tenant(&state, "T").await;
        let learner = create_learner(&state, tenant.id).await;

        let (status, _) = feedback_handler(
            State(state.clone()),
            tenant_headers(tenant.id),
            Json(NewFeedback {
                learner_id: learner.id,
                latency_ms: 300,
                rating: 1,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = feedback_handler(
            State(state),
            tenant_headers(tenant.id),
            Json(NewFeedback {
                learner_id: learner.id,
                latency_ms: 300,
                rating: 2,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(LearnPalError::LearnerNotFound(3)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LearnPalError::ConceptNotFound("id 9".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LearnPalError::Database("locked".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
