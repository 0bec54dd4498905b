// MetabolicGuide-api lib.rs
//
// HTTP surface of MetabolicGuide: configuration, application context,
// routes, handlers and the OpenAPI document.

// Public modules
pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;

pub use api::{create_application, AppContext, ContextError};
pub use config::{AppConfig, ConfigError};
