use crate::config::UploadConfig;
use crate::error::RelayError;
use crate::models::{ImagePair, UploadedImage, GLTF_BINARY_CONTENT_TYPE};
use crate::services::GenerationResponse;
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use metrics::{counter, histogram};
use service_core::observability::extract_request_id;
use std::time::Instant;

/// Longest prefix of an upstream error body that is read and logged.
const UPSTREAM_LOG_BODY_BYTES: usize = 512;

/// `POST /model/create`: turn two uploaded images into a glTF binary.
pub async fn create_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let request_id = extract_request_id(&headers);
    let result = relay(&state, request_id.as_deref(), multipart).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.category(),
    };
    counter!("model_generation_total", "outcome" => outcome).increment(1);

    if let Err(err) = &result {
        if err.is_client_error() {
            tracing::info!(error = %err, "Rejected model request");
        } else {
            tracing::error!(error = %err, category = err.category(), "Model generation failed");
        }
    }

    result
}

async fn relay(
    state: &AppState,
    request_id: Option<&str>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request body is not a multipart upload");
        RelayError::MissingImages { received: 0 }
    })?;

    let images = collect_images(multipart, &state.config.upload).await?;
    let images = ImagePair::try_from(images)?;

    let generator = &state.generator;
    let started = Instant::now();
    let upstream = generator.generate_model(&images, request_id).await?;
    histogram!("generator_request_duration_seconds").record(started.elapsed().as_secs_f64());

    if upstream.status() != StatusCode::OK {
        let status = upstream.status();
        let body = body_prefix(upstream, UPSTREAM_LOG_BODY_BYTES).await;
        tracing::error!(
            status = %status,
            endpoint = %generator.endpoint(),
            body = %body,
            "Generator returned an error"
        );
        return Err(RelayError::Upstream { status });
    }

    let response = match GenerationResponse::from_upstream(generator.contract(), upstream).await? {
        GenerationResponse::Buffered(model) => {
            tracing::info!(size = model.len(), "Model generated");
            ([(header::CONTENT_TYPE, GLTF_BINARY_CONTENT_TYPE)], model).into_response()
        }
        GenerationResponse::Streamed(upstream) => {
            let content_length = upstream.content_length();
            // The spooled images ride along with the body so they are removed
            // only once the stream finishes or the client goes away.
            let stream = upstream.bytes_stream().map(move |chunk| {
                let _images = &images;
                chunk.map_err(|e| {
                    tracing::error!(error = %e, "Generator stream failed");
                    e
                })
            });

            let mut response = (
                [(header::CONTENT_TYPE, GLTF_BINARY_CONTENT_TYPE)],
                Body::from_stream(stream),
            )
                .into_response();
            if let Some(len) = content_length {
                response.headers_mut().insert(header::CONTENT_LENGTH, len.into());
            }
            tracing::info!(content_length = ?content_length, "Streaming model to client");
            response
        }
    };

    Ok(response)
}

/// Spool the first two `images` parts; later ones are skipped without touching disk.
async fn collect_images(
    mut multipart: Multipart,
    config: &UploadConfig,
) -> Result<Vec<UploadedImage>, RelayError> {
    let mut images = Vec::with_capacity(2);
    let mut ignored = 0usize;

    while let Some(field) = multipart.next_field().await? {
        if !is_image_field(field.name()) {
            continue;
        }
        if images.len() == 2 {
            ignored += 1;
            continue;
        }
        images.push(UploadedImage::spool(field, config).await?);
    }

    if ignored > 0 {
        tracing::warn!(ignored = ignored, "Ignoring images beyond the first two");
    }

    Ok(images)
}

/// Read at most `limit` bytes of a response body; the rest is never pulled.
async fn body_prefix(response: reqwest::Response, limit: usize) -> String {
    let mut stream = response.bytes_stream();
    let mut prefix = Vec::with_capacity(limit);
    while prefix.len() < limit {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(limit - prefix.len());
                prefix.extend_from_slice(&chunk[..take]);
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Failed to read generator error body");
                break;
            }
            None => break,
        }
    }
    String::from_utf8_lossy(&prefix).into_owned()
}

fn is_image_field(name: Option<&str>) -> bool {
    matches!(name, Some("images") | Some("images[]"))
}
