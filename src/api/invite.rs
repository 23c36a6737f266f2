// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    api::page,
    error::ApiError,
    registration::{Outcome, OutcomeTag},
    state::AppState,
};

/// Invite request. Exactly one field, `address`, is accepted.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InviteForm {
    /// Tezos wallet address (36 characters).
    pub address: String,
}

/// HTTP status for a workflow outcome.
pub fn status_for(tag: OutcomeTag) -> StatusCode {
    if tag == OutcomeTag::BadInput {
        StatusCode::BAD_REQUEST
    } else if tag.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

fn outcome_response(outcome: &Outcome) -> Response {
    (status_for(outcome.tag), Html(page::render_outcome(outcome))).into_response()
}

/// Request a single-use invite for a wallet.
///
/// Form rejections (no fields, unknown fields, a repeated `address`) never
/// reach the workflow.
#[utoipa::path(
    post,
    path = "/invite",
    request_body(content = InviteForm, content_type = "application/x-www-form-urlencoded"),
    tag = "Invites",
    responses(
        (status = 200, description = "Issued, already registered, or wallet not found", body = String, content_type = "text/html"),
        (status = 400, description = "Malformed form or address", body = String, content_type = "text/html"),
        (status = 500, description = "Upstream, invite platform, or storage failure", body = String, content_type = "text/html")
    )
)]
pub async fn request_invite(
    State(state): State<AppState>,
    form: Result<Form<InviteForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form.map_err(|rejection| {
        debug!(error = %rejection, "Rejected invite form");
        ApiError::bad_request(page::headline(OutcomeTag::BadInput))
    })?;

    let outcome = state.workflow.register(&form.address).await;
    Ok(outcome_response(&outcome))
}
