pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod federation;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod profile;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Homeserver API",
        version = "1.0.0",
        description = "Client, media and federation endpoints of a homeserver with blurhash support"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::whoami,
        handlers::media::upload_media,
        handlers::media::download_media,
        handlers::profile::get_profile,
        handlers::profile::get_profile_field,
        handlers::profile::set_profile_field,
        handlers::room::create_room,
        handlers::room::join_room,
        handlers::room::join_room_by_id,
        handlers::room::send_event,
        handlers::room::get_messages,
        handlers::room::get_event,
        handlers::federation::query_profile,
        handlers::federation::server_keys,
    ),
    tags(
        (name = "Accounts", description = "Registration and login"),
        (name = "Media", description = "Upload and download, with optional blurhash generation"),
        (name = "Profile", description = "Display name, avatar and avatar blurhash"),
        (name = "Rooms", description = "Rooms and their timelines"),
        (name = "Federation", description = "Server-to-server endpoints"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "x_matrix",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "X-Matrix origin=\"..\",destination=\"..\",key=\"..\",sig=\"..\"",
            ))),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();
    let cors = cors_layer(&state.config.server.cors);

    routes::api_routes(&state.config)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
