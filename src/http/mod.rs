//! HTTP entry point: client identification, admission and rejection responses.

mod middleware;
mod routes;
mod server;

pub use middleware::{client_key, rate_limit, UNKNOWN_CLIENT};
pub use routes::{router, DEMO_PATH, HEALTH_PATH};
pub use server::HttpServer;
