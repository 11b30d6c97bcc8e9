pub mod health;
pub mod model;

pub use health::{health_check, index, metrics_endpoint};
pub use model::create_model;
