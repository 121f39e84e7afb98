pub mod inventory_item;
pub mod plot;
pub mod supervisor;
pub mod task;

pub use inventory_item::Entity as InventoryItem;
pub use plot::Entity as Plot;
pub use supervisor::Entity as Supervisor;
pub use task::Entity as Task;
