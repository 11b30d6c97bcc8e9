pub mod generator;
pub mod metrics;

pub use generator::{GenerationResponse, GeneratorClient, GeneratorError};
pub use metrics::{get_metrics, init_metrics};
