//! Client for the external 3D model generator.
//!
//! One POST per call, no retries. Non-2xx statuses come back as a normal
//! response and the caller decides what to do with them.

use crate::config::{GeneratorConfig, GeneratorContract};
use crate::models::{decode_model_payload, GenerationRequest, ImagePair};
use reqwest::{header::ACCEPT, Client};
use service_core::observability::TracedClientExt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Failed to build generator client: {0}")]
    Client(reqwest::Error),

    #[error("Failed to reach generator: {0}")]
    Transport(reqwest::Error),

    #[error("Failed to read spooled image: {0}")]
    Payload(std::io::Error),

    #[error("Failed to read generator response: {0}")]
    Body(reqwest::Error),

    #[error("Invalid model payload: {0}")]
    Decode(String),
}

/// Upstream result after a successful status check.
pub enum GenerationResponse {
    /// Model bytes decoded from a base64 payload.
    Buffered(Vec<u8>),
    /// Live upstream response whose body is the glTF binary.
    Streamed(reqwest::Response),
}

impl GenerationResponse {
    pub async fn from_upstream(
        contract: GeneratorContract,
        response: reqwest::Response,
    ) -> Result<Self, GeneratorError> {
        if contract.streams_response() {
            return Ok(GenerationResponse::Streamed(response));
        }

        let body = response.bytes().await.map_err(GeneratorError::Body)?;
        decode_model_payload(&body)
            .map(GenerationResponse::Buffered)
            .map_err(GeneratorError::Decode)
    }
}

pub struct GeneratorClient {
    client: Client,
    endpoint: String,
    contract: GeneratorContract,
}

impl GeneratorClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(GeneratorError::Client)?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            contract: config.contract,
        })
    }

    pub fn contract(&self) -> GeneratorContract {
        self.contract
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send both images to the generator and hand back its raw response.
    pub async fn generate_model(
        &self,
        images: &ImagePair,
        request_id: Option<&str>,
    ) -> Result<reqwest::Response, GeneratorError> {
        let payload = GenerationRequest::build(self.contract, images)
            .await
            .map_err(GeneratorError::Payload)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            contract = ?self.contract,
            image_bytes = images.total_size(),
            "Sending generation request"
        );

        self.client
            .traced_post(&self.endpoint)
            .header(ACCEPT.as_str(), self.contract.accept())
            .json(&payload)
            .send(request_id)
            .await
            .map_err(GeneratorError::Transport)
    }
}
