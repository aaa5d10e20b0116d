//! Port Interfaces
//!
//! Driven ports implemented by infrastructure adapters.

mod inventory_port;

#[cfg(test)]
pub use inventory_port::MockInventoryPort;
pub use inventory_port::{InventoryPort, InventoryPortError};
