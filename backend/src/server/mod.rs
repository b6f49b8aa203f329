//! HTTP server wiring shared by the binary and integration tests.

pub mod config;

use std::sync::Arc;

use actix_web::{App, web};
use url::Url;
#[cfg(debug_assertions)]
use utoipa::OpenApi as _;

use crate::domain::ports::ParticipantStoreError;
use crate::domain::{LaunchService, OsRngTokenGenerator};
use crate::inbound::http::health::{self, HealthState};
use crate::inbound::http::launch;
use crate::inbound::http::state::HttpState;
use crate::outbound::persistence::MemoryParticipantStore;
use crate::outbound::settings::JsonPolicyStore;

/// Assemble handler state over the embedded participant store.
///
/// Activates a participant table for every active survey in the policy
/// document, so launches against inactive surveys are turned away at the
/// activation gate.
///
/// # Errors
///
/// Returns [`ParticipantStoreError`] when table activation fails.
pub fn build_state(
    policies: JsonPolicyStore,
    public_base_url: Url,
) -> Result<HttpState, ParticipantStoreError> {
    let store = Arc::new(MemoryParticipantStore::new());
    for survey_id in policies.active_survey_ids() {
        store.activate(survey_id)?;
    }
    let service = LaunchService::new(store, Arc::new(OsRngTokenGenerator));
    Ok(HttpState::new(
        Arc::new(service),
        Arc::new(policies),
        public_base_url,
    ))
}

#[cfg(debug_assertions)]
async fn openapi_json() -> web::Json<utoipa::openapi::OpenApi> {
    web::Json(crate::ApiDoc::openapi())
}

/// Build the actix application serving the gateway.
pub fn build_app(
    state: HttpState,
    health_state: web::Data<HealthState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let mut app = App::new()
        .app_data(web::Data::new(state))
        .app_data(health_state)
        .service(web::scope("/lti").service(launch::launch))
        .service(health::ready)
        .service(health::live);

    #[cfg(debug_assertions)]
    {
        app = app.route("/api-docs/openapi.json", web::get().to(openapi_json));
    }

    app
}
