// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod health;
pub mod invite;
pub mod page;

/// Build the HTTP router. Paths not matched by a route are served from
/// `www_dir`.
pub fn router(state: AppState, www_dir: &Path) -> Router {
    let routes = Router::new()
        .route(
            "/invite",
            get(invite::request_invite).post(invite::request_invite),
        )
        .route("/health", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback_service(ServeDir::new(www_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        invite::request_invite,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            invite::InviteForm,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Invites", description = "Wallet-gated invite issuance"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
