//! Lifeboat - streaming client core for AI-generated survival scenarios
//!
//! This library exposes modules for use in integration tests.

pub mod client;
pub mod config;
pub mod models;
pub mod runner;
pub mod scenario;
pub mod sse;
