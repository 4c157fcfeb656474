//! Fabricate Engine Library
//!
//! This library provides the core functionality of the Fabricate engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Code generation service abstraction
pub mod generation;

/// Persona pipeline: planning, synthesis, and orchestration
pub mod persona;

/// Remote hosting service abstraction
pub mod remote;

/// Version control backend
pub mod vcs;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
