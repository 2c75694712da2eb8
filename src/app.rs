use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/period", post(handlers::form_period))
        .route("/settings", post(handlers::form_settings))
        .route("/records", post(handlers::form_create_record))
        .route("/records/:id", post(handlers::form_update_record))
        .route("/records/:id/delete", post(handlers::form_delete_record))
        .route("/buyers", post(handlers::form_add_buyer))
        .route("/buyers/delete", post(handlers::form_remove_buyer))
        .route("/categories", post(handlers::form_add_category))
        .route("/categories/delete", post(handlers::form_remove_category))
        .route("/export/:format", get(handlers::export_period))
        .route("/api/state", get(handlers::get_state))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/records", post(handlers::create_record))
        .route(
            "/api/records/:id",
            put(handlers::update_record).delete(handlers::delete_record),
        )
        .route("/api/period", put(handlers::put_period))
        .route("/api/settings", put(handlers::put_settings))
        .route("/api/buyers", post(handlers::add_buyer))
        .route("/api/buyers/:name", delete(handlers::remove_buyer))
        .route("/api/categories", post(handlers::add_category))
        .route("/api/categories/:name", delete(handlers::remove_category))
        .with_state(state)
}
