use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::session::{BootstrapQuery, BootstrapResponse},
    error::AppError,
    services::session_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/session",
    params(BootstrapQuery),
    responses(
        (status = 200, description = "Session created or refreshed", body = BootstrapResponse),
        (status = 400, description = "Invalid parameters or user not in group"),
        (status = 404, description = "Unknown user or group"),
    )
)]
/// Create or refresh the socket session for a user and return the bootstrap record.
pub async fn bootstrap(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<BootstrapQuery>,
) -> Result<Json<BootstrapResponse>, AppError> {
    query.validate()?;
    let record =
        session_service::bootstrap(&state, &query, addr.ip().to_string(), crate::clock::now())
            .await?;
    Ok(Json(record))
}

/// Configure the session routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/session", get(bootstrap))
}
