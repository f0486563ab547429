//! Health endpoint types.

use serde::Serialize;
use utoipa::ToSchema;

/// Health report returned by the healthcheck endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Storage backend status.
    pub storage: &'static str,
    /// Number of live socket connections.
    pub connections: usize,
}
