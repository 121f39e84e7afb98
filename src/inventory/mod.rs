pub mod model;
pub mod service;

pub use model::{InventoryItemCreate, InventoryItemDto, InventoryUpdate, StockAdjustment};
pub use service::InventoryLedger;
