pub mod auth;
pub mod metrics;

pub use auth::{CurrentUser, RequireUser};
pub use metrics::http_metrics_middleware;
