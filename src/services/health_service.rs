//! Service health aggregation.

use crate::{dto::health::HealthResponse, state::SharedState};

/// Build the health report for the healthcheck endpoint.
pub async fn report(state: &SharedState) -> HealthResponse {
    let storage = match state.store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => "up",
            Err(_) => "failing",
        },
        None => "degraded",
    };

    HealthResponse {
        status: if storage == "up" { "ok" } else { "degraded" },
        storage,
        connections: state.directory().len(),
    }
}
