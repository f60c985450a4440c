mod handler;
mod model;

pub use handler::{HEALTH_PATH, health};
pub use model::HealthResponse;
