use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use linetime_core::health::{healthz, ping, readyz};
use linetime_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    auth::{
        change_password, forgot_password, google_login, login, login_with_code, me, refresh,
        register, reset_password, send_login_code, set_password,
    },
    event::{
        create_event, delete_event, delete_event_image, get_event, list_events, update_event,
    },
    space::{
        create_space, get_space, join_space, list_members, list_spaces, refresh_invite,
        remove_member,
    },
    upload::{upload_image, upload_images},
    user::{clear_default_space, set_default_space},
};
use crate::state::AppState;

/// Headroom for multipart boundaries and form fields on top of the file payload.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = (state.upload.max_file_size as usize)
        .saturating_mul(state.upload.max_files.max(1))
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Health
        .route("/ping", get(ping))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Auth
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/google", post(google_login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/me", get(me))
        .route("/api/auth/send-login-code", post(send_login_code))
        .route("/api/auth/login-code", post(login_with_code))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/set-password", post(set_password))
        // Spaces
        .route("/api/spaces", post(create_space).get(list_spaces))
        .route("/api/spaces/join/{code}", post(join_space))
        .route("/api/spaces/{id}", get(get_space))
        .route("/api/spaces/{id}/invite", post(refresh_invite))
        .route("/api/spaces/{id}/members", get(list_members))
        .route("/api/spaces/{id}/members/{user_id}", delete(remove_member))
        // Events
        .route("/api/events", post(create_event))
        .route("/api/events/spaces/{space_id}", get(list_events))
        .route("/api/events/images/{image_id}", delete(delete_event_image))
        .route(
            "/api/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        // Users
        .route(
            "/api/users/default-space",
            put(set_default_space).delete(clear_default_space),
        )
        // Upload
        .route("/api/upload/image", post(upload_image))
        .route("/api/upload/images", post(upload_images))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
