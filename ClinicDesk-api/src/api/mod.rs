pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;

pub use state::AppState;

/// Create the application router
pub fn create_application(state: AppState, cors_origin: Option<&str>) -> Router {
    routes::create_app(state, cors_origin)
}
