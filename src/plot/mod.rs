pub mod model;
pub mod service;

pub use model::{Geolocation, PlotCreate, PlotDto, PlotPatch};
pub use service::PlotService;
