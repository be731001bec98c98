use crate::transport::http::types::{AppState, HealthOut};
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthOut)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "ok".to_string(),
        chain_height: state.chain.height().await,
    })
}
