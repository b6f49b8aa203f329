//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use url::Url;

use crate::domain::ports::{LaunchCommand, PolicyStore};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Launch orchestration driving port.
    pub launch: Arc<dyn LaunchCommand>,
    /// Per-survey policy resolution.
    pub policies: Arc<dyn PolicyStore>,
    /// Absolute base URL participant redirects are built under.
    pub public_base_url: Url,
}

impl HttpState {
    /// Bundle the ports a handler needs.
    #[must_use]
    pub fn new(
        launch: Arc<dyn LaunchCommand>,
        policies: Arc<dyn PolicyStore>,
        public_base_url: Url,
    ) -> Self {
        Self {
            launch,
            policies,
            public_base_url,
        }
    }
}
