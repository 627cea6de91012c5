//! Runcoach daemon library - exposes modules for testing.

pub mod config;
pub mod orchestrator;
pub mod routes;
pub mod server;
