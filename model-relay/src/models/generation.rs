use crate::config::GeneratorContract;
use crate::models::image::ImagePair;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

pub const GLTF_BINARY_CONTENT_TYPE: &str = "model/gltf-binary";

/// JSON body sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerationRequest {
    Paths {
        image1_path: String,
        image2_path: String,
    },
    Inline {
        image1: String,
        image2: String,
    },
}

impl GenerationRequest {
    pub async fn build(contract: GeneratorContract, images: &ImagePair) -> std::io::Result<Self> {
        match contract {
            GeneratorContract::PathStream | GeneratorContract::PathBase64 => {
                Ok(GenerationRequest::Paths {
                    image1_path: images.first.path().to_string_lossy().into_owned(),
                    image2_path: images.second.path().to_string_lossy().into_owned(),
                })
            }
            GeneratorContract::InlineBase64 => Ok(GenerationRequest::Inline {
                image1: STANDARD.encode(images.first.read_bytes().await?),
                image2: STANDARD.encode(images.second.read_bytes().await?),
            }),
        }
    }
}

/// Base64 model payload as the generator may send it.
///
/// Accepted: a JSON string, or an object with a `model` (alias `data`) field.
/// Bare base64 text is handled before JSON parsing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EncodedModel {
    Raw(String),
    Wrapped {
        #[serde(alias = "data")]
        model: String,
    },
}

impl EncodedModel {
    fn into_inner(self) -> String {
        match self {
            EncodedModel::Raw(encoded) | EncodedModel::Wrapped { model: encoded } => encoded,
        }
    }
}

/// Decode a buffered base64 model payload into glTF bytes.
pub fn decode_model_payload(body: &[u8]) -> Result<Vec<u8>, String> {
    let text = std::str::from_utf8(body).map_err(|_| "payload is not UTF-8".to_string())?;
    let trimmed = text.trim();

    let encoded = if trimmed.starts_with('{') || trimmed.starts_with('"') {
        serde_json::from_str::<EncodedModel>(trimmed)
            .map_err(|e| format!("unrecognised payload shape: {}", e))?
            .into_inner()
    } else {
        trimmed.to_string()
    };

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::tests::image_with;
    use serde_json::json;

    const GLB: &[u8] = b"glTF\x02\x00\x00\x00";

    #[test]
    fn decodes_raw_base64_with_whitespace() {
        let body = format!("  {}\n", STANDARD.encode(GLB));
        assert_eq!(decode_model_payload(body.as_bytes()).unwrap(), GLB);
    }

    #[test]
    fn decodes_json_string_payload() {
        let body = json!(STANDARD.encode(GLB)).to_string();
        assert_eq!(decode_model_payload(body.as_bytes()).unwrap(), GLB);
    }

    #[test]
    fn decodes_wrapped_payload_under_model_or_data() {
        let model = json!({ "model": STANDARD.encode(GLB) }).to_string();
        let data = json!({ "data": STANDARD.encode(GLB) }).to_string();
        assert_eq!(decode_model_payload(model.as_bytes()).unwrap(), GLB);
        assert_eq!(decode_model_payload(data.as_bytes()).unwrap(), GLB);
    }

    #[test]
    fn rejects_unknown_shapes_and_bad_base64() {
        assert!(decode_model_payload(br#"{"mesh": "abc"}"#).is_err());
        assert!(decode_model_payload(b"not base64 at all!").is_err());
        assert!(decode_model_payload(&[0xff, 0xfe]).is_err());
    }

    #[tokio::test]
    async fn path_contract_references_spooled_files() {
        let pair = ImagePair::try_from(vec![image_with(b"a"), image_with(b"b")]).unwrap();
        let request = GenerationRequest::build(GeneratorContract::PathStream, &pair)
            .await
            .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["image1_path"], pair.first.path().to_string_lossy().as_ref());
        assert_eq!(body["image2_path"], pair.second.path().to_string_lossy().as_ref());
        assert_eq!(body.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn inline_contract_embeds_base64_images() {
        let pair =
            ImagePair::try_from(vec![image_with(&[1, 2, 3]), image_with(&[250, 251])]).unwrap();
        let request = GenerationRequest::build(GeneratorContract::InlineBase64, &pair)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "image1": "AQID", "image2": "+vs=" })
        );
    }
}
