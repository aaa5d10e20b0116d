//! Application Services

mod low_stock;

pub use low_stock::{LOW_STOCK_MESSAGE, LowStockAlert, LowStockMonitor};
