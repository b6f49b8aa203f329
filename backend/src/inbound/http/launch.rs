//! Launch HTTP handler.
//!
//! ```text
//! POST /lti/launch/{survey_id}
//! ```
//!
//! The consumer platform posts a signed form here; on success the
//! participant's browser is redirected into the survey session.

use actix_web::{HttpRequest, HttpResponse, http::header, post, web};
use url::Url;

use crate::domain::ports::{HandleLaunchRequest, RedirectTarget};
use crate::domain::{Error, HttpMethod, LaunchRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_survey_id};

/// Query parameter carrying the session token on the redirect.
const TOKEN_PARAM: &str = "token";
/// Marker telling the survey engine to start a fresh attempt.
const NEW_ATTEMPT_PARAM: &str = "newtest";
const NEW_ATTEMPT_VALUE: &str = "Y";

/// Reassemble the launch exactly as the consumer signed it: the externally
/// visible URL plus every query and form parameter.
fn received_launch(req: &HttpRequest, form: Vec<(String, String)>) -> LaunchRequest {
    let info = req.connection_info();
    let url = format!(
        "{}://{}{}",
        info.scheme(),
        info.host(),
        req.uri().path()
    );

    let mut params: Vec<(String, String)> =
        url::form_urlencoded::parse(req.query_string().as_bytes())
            .into_owned()
            .collect();
    params.extend(form);

    LaunchRequest::new(HttpMethod::Post, url, params)
}

/// Render the absolute redirect URL for a resolved session.
fn redirect_url(base: &Url, target: &RedirectTarget) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::internal("survey base URL cannot carry path segments"))?
        .pop_if_empty()
        .push("survey")
        .push(&target.survey_id.to_string());
    url.query_pairs_mut()
        .append_pair(TOKEN_PARAM, target.token.as_str());
    if target.fresh {
        url.query_pairs_mut()
            .append_pair(NEW_ATTEMPT_PARAM, NEW_ATTEMPT_VALUE);
    }
    Ok(url)
}

/// Handle a signed launch and redirect into the participant session.
#[utoipa::path(
    post,
    path = "/lti/launch/{survey_id}",
    params(
        ("survey_id" = String, Path, description = "Numeric survey identifier")
    ),
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Signed LTI launch form parameters"
    ),
    responses(
        (status = 302, description = "Redirect into the participant session"),
        (status = 400, description = "Malformed launch request", body = Error),
        (status = 401, description = "Signature or consumer key rejected", body = Error),
        (status = 404, description = "Survey unknown or not activated", body = Error),
        (status = 409, description = "Survey already completed", body = Error),
        (status = 503, description = "Participant store unavailable", body = Error)
    ),
    tags = ["launch"],
    operation_id = "launchSurvey"
)]
#[post("/launch/{survey_id}")]
pub async fn launch(
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Form<Vec<(String, String)>>,
    state: web::Data<HttpState>,
) -> ApiResult<HttpResponse> {
    let survey_id = parse_survey_id(&path.into_inner(), FieldName::new("survey_id"))?;

    let policy = state
        .policies
        .policy_for(survey_id)
        .await
        .map_err(|err| Error::service_unavailable(err.to_string()))?
        .ok_or_else(|| Error::not_found(format!("survey {survey_id} is not configured for launch")))?;

    let launch = received_launch(&req, form.into_inner());
    let response = state
        .launch
        .handle_launch(HandleLaunchRequest {
            survey_id,
            launch,
            policy,
        })
        .await?;

    let target = redirect_url(&state.public_base_url, &response.redirect)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, target.to_string()))
        .finish())
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
