use axum::{
    Router,
    routing::{get, post, put},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/_matrix/client/v3", client_routes())
        .nest("/_matrix/media/v3", media_routes(config))
        .nest("/_matrix/federation/v1", federation_routes())
        .route("/_matrix/key/v2/server", get(handlers::federation::server_keys))
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/account/whoami", get(handlers::auth::whoami))
        .route("/profile/{user_id}", get(handlers::profile::get_profile))
        .route(
            "/profile/{user_id}/{field}",
            get(handlers::profile::get_profile_field).put(handlers::profile::set_profile_field),
        )
        .route("/createRoom", post(handlers::room::create_room))
        .route("/join/{room_id}", post(handlers::room::join_room_by_id))
        .route("/rooms/{room_id}/join", post(handlers::room::join_room))
        .route(
            "/rooms/{room_id}/send/{event_type}/{txn_id}",
            put(handlers::room::send_event),
        )
        .route("/rooms/{room_id}/messages", get(handlers::room::get_messages))
        .route(
            "/rooms/{room_id}/event/{event_id}",
            get(handlers::room::get_event),
        )
}

fn media_routes(config: &AppConfig) -> Router<AppState> {
    let upload = Router::new()
        .route("/upload", post(handlers::media::upload_media))
        .layer(handlers::media::media_upload_body_limit(
            config.media.max_upload_size,
        ));

    Router::new()
        .route(
            "/download/{server_name}/{media_id}",
            get(handlers::media::download_media),
        )
        .merge(upload)
}

fn federation_routes() -> Router<AppState> {
    Router::new().route("/query/profile", get(handlers::federation::query_profile))
}
