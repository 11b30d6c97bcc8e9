pub mod generation;
pub mod image;

pub use generation::{decode_model_payload, GenerationRequest, GLTF_BINARY_CONTENT_TYPE};
pub use image::{ImagePair, UploadedImage};
