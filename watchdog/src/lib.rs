//! Device offline watchdog.
//!
//! Periodically reads the device registry and sends a push notification for
//! every device whose last telemetry is older than the offline threshold.
//! The binary entrypoint lives in `main.rs`; modules are public so the
//! integration tests can drive the cycle with in-memory collaborators.

pub mod config;
pub mod cycle;
pub mod db;
pub mod errors;
pub mod liveness;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod registry;
pub mod rest;
pub mod scheduler;
