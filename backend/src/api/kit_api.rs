use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::kit::{KitError, NftOpenActionKit};
use crate::platforms::PlatformError;
use crate::types::{ActionData, ActionDataParams};

#[derive(Clone)]
pub struct KitApiState {
    pub kit: Arc<NftOpenActionKit>,
}

impl KitApiState {
    pub fn new(kit: Arc<NftOpenActionKit>) -> Self {
        Self { kit }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub platforms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalldataRequest {
    pub content_uri: String,
    pub publishing_client_profile_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalldataResponse {
    pub calldata: Option<String>,
}

/// Kit failure rendered as `{"error": ...}` with a status matching its cause.
#[derive(Debug)]
pub struct ApiError(pub KitError);

impl From<KitError> for ApiError {
    fn from(e: KitError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            KitError::NoPrice | KitError::NoUiData => StatusCode::UNPROCESSABLE_ENTITY,
            KitError::Bridge(_) | KitError::NoActionResponse(_) => StatusCode::BAD_GATEWAY,
            KitError::InitDataNotFound(_) | KitError::InvalidInitData(_) | KitError::UnsupportedChain(_) => {
                StatusCode::BAD_REQUEST
            }
            KitError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            KitError::Platform(e) => match e {
                PlatformError::InvalidInput(_)
                | PlatformError::InvalidAddress(_)
                | PlatformError::InvalidAmount(_)
                | PlatformError::UnsupportedChain(_)
                | PlatformError::UnsupportedSignature(_)
                | PlatformError::UnknownPlatform(_) => StatusCode::BAD_REQUEST,
                PlatformError::UnrecognizedContract(_) | PlatformError::DataIntegrity(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PlatformError::Network(_)
                | PlatformError::Rpc(_)
                | PlatformError::Json(_)
                | PlatformError::RemoteApi(_)
                | PlatformError::ContractCall(_) => StatusCode::BAD_GATEWAY,
                PlatformError::Configuration(_) | PlatformError::AbiEncoding(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn create_kit_router(state: KitApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/calldata", post(detect_calldata))
        .route("/api/action-data", post(action_data))
        .with_state(state)
}

async fn health_check(State(state): State<KitApiState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), platforms: state.kit.platform_names() })
}

/// Init data for the NFT linked from a post, `null` when there is nothing to mint.
async fn detect_calldata(
    State(state): State<KitApiState>,
    Json(request): Json<CalldataRequest>,
) -> Result<Json<CalldataResponse>, ApiError> {
    info!("Detecting calldata for {}", request.content_uri);

    let calldata = state
        .kit
        .detect_and_return_calldata(&request.content_uri, &request.publishing_client_profile_id)
        .await?;
    Ok(Json(CalldataResponse { calldata: calldata.map(|bytes| format!("0x{}", hex::encode(bytes))) }))
}

async fn action_data(
    State(state): State<KitApiState>,
    Json(params): Json<ActionDataParams>,
) -> Result<Json<ActionData>, ApiError> {
    info!("Building action data for publication {}-{}", params.post.profile_id, params.post.pub_id);
    Ok(Json(state.kit.action_data_from_post(&params).await?))
}
