pub mod api;
mod app_state;
mod bootstrap;
mod openapi;
mod responses;
mod router;
pub mod telemetry;

pub(crate) use app_state::AppState;
pub use bootstrap::{serve, ConfigError, ServeOptions};

#[cfg(test)]
mod http_tests;
