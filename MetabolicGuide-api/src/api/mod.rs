pub mod context;
pub mod handlers;
pub mod routes;

use axum::Router;

pub use context::{AppContext, ContextError};

/// Create the application router
pub fn create_application(context: AppContext, cors_allow_origin: Option<&str>) -> Router {
    routes::create_app(context, cors_allow_origin)
}
