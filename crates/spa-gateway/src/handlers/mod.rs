//! HTTP request handlers for the SPA gateway.

pub mod health;
pub mod me;
pub mod metrics;
pub mod oauth;

pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use oauth::{callback, exchange_token, login, logout, refresh_token};
