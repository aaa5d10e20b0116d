//! Application Layer
//!
//! The inventory port and the order orchestrator that drives it.

/// Port interfaces for external systems.
pub mod ports;

/// Application services.
pub mod services;
