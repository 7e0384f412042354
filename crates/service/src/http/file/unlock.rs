use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use common::policy::AccessGate;

use super::serve::policy_error_response;
use super::{canonical_path, cookies};
use crate::http::handlers::unauthorized;
use crate::ServiceState;

#[derive(Debug, Deserialize)]
pub struct UnlockForm {
    #[serde(default)]
    pub access_key: String,
}

/// `POST` target of the unauthorized page's form.
///
/// On a correct key the browser is given an `access_key` cookie for the
///  file's paths and sent back to the file.
#[tracing::instrument(skip_all, fields(file = %name))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Form(form): Form<UnlockForm>,
) -> Response {
    let site_path = &state.site().site_path;
    let location = canonical_path(site_path, &name);

    let metadata = match state.expiry().resolve(&name).await {
        Ok(metadata) => metadata,
        Err(e) => return policy_error_response(&headers, site_path, &name, e),
    };

    if metadata.required_access_key().is_none() {
        return Redirect::to(&location).into_response();
    }

    if !AccessGate::check_key(&form.access_key, &metadata) {
        tracing::debug!("wrong access key submitted");
        return unauthorized(&headers, &location);
    }

    let mut response = Redirect::to(&location).into_response();
    cookies::set_access_key(response.headers_mut(), site_path, &name, &form.access_key);
    response
}
