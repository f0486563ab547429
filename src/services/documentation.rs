use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the broker.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::bootstrap,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::BootstrapResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session bootstrap for socket clients"),
        (name = "socket", description = "WebSocket entry point"),
    )
)]
pub struct ApiDoc;
