//! Anomaly agent daemon
//!
//! Serves annotated pod metrics alongside health and Prometheus endpoints.

pub mod api;
pub mod config;
