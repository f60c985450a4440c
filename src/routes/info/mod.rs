mod handler;
mod model;

pub use handler::root;
pub use model::InfoResponse;
