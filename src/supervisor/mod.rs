pub mod model;
pub mod service;

pub use model::{SupervisorCreate, SupervisorDto, SupervisorPatch};
pub use service::SupervisorService;
