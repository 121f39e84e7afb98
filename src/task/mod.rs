pub mod model;
pub mod service;

pub use model::{TaskCreate, TaskDto, TaskPatch};
pub use service::TaskService;
