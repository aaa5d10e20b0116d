//! Application Services

mod orchestrator;

pub use orchestrator::OrderOrchestrator;
