//! Domain Layer
//!
//! Order values and the session store. No transport concerns.

/// Order items, advisory checks and outcomes.
pub mod order;

/// Per-session pending items.
pub mod session;
