use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use tracing::error;

use super::error::ApiError;
use super::schema::{RefineRequest, RefineResponse, ServiceInfo};
use super::AppState;

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Refine a casual prompt into an expert-level one. The provider is never
/// called for a body that fails validation.
pub async fn refine(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RefineResponse>, ApiError> {
    // A header that is not valid text cannot name a JSON type.
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap_or("invalid"));
    let request =
        RefineRequest::from_body(content_type, &body).map_err(ApiError::Validation)?;

    let refined = state
        .refiner
        .refine(&request.prompt)
        .await
        .inspect_err(|e| {
            error!(vendor = %e.vendor, error = %e.source, "error refining prompt");
        })?;

    Ok(Json(RefineResponse {
        original: request.prompt,
        refined,
        model: state.refiner.model().to_string(),
    }))
}
