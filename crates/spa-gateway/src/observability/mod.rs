//! Observability for the SPA gateway.
//!
//! Provides Prometheus metric definitions and the recorder setup.

pub mod metrics;
