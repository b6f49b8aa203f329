//! LTI launch gateway: verifies OAuth 1.0a-signed survey launches, maps
//! platform attributes onto a canonical identity, and resumes or provisions
//! participant sessions.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
