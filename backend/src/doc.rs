//! OpenAPI document describing the gateway's HTTP surface.

use utoipa::OpenApi;

/// Public OpenAPI surface used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "lti-gateway",
        description = "OAuth 1.0a-signed launch gateway for survey participant sessions"
    ),
    paths(
        crate::inbound::http::launch::launch,
        crate::inbound::http::health::live,
        crate::inbound::http::health::ready,
    ),
    components(schemas(crate::domain::Error, crate::domain::ErrorCode))
)]
pub struct ApiDoc;
