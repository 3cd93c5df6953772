pub mod config;
mod http_layers;
mod insights_routes;
pub mod metrics;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use insights_routes::ApiResponse;
pub use server::run_server;
