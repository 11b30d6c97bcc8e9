use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Per-part upload ceiling (10 MiB).
const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Port the generator listens on when `GENERATOR_URL` is not set.
const DEFAULT_GENERATOR_PORT: u16 = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub generator: GeneratorConfig,
    pub upload: UploadConfig,
    pub cors: CorsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL, always with a scheme and without a trailing slash.
    pub url: String,
    pub contract: GeneratorContract,
    /// Connect timeout for the generator. The generation itself is unbounded.
    pub connect_timeout_secs: Option<u64>,
}

impl GeneratorConfig {
    /// Full URL of the generator endpoint for the configured contract.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.url, self.contract.path())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    /// Optional whole-body ceiling. Unset means only the per-file limit applies.
    pub max_request_bytes: Option<usize>,
    /// Where uploads are spooled. Path contracts require the generator to see this directory.
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

/// Request/response shape spoken by the model generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorContract {
    /// `POST /generate` with spooled file paths; the glTF binary is streamed back.
    #[default]
    PathStream,
    /// `POST /generate` with spooled file paths; the model comes back base64 encoded.
    PathBase64,
    /// `POST /model/create` with both images inline as base64; base64 response.
    InlineBase64,
}

impl GeneratorContract {
    pub fn path(&self) -> &'static str {
        match self {
            GeneratorContract::PathStream | GeneratorContract::PathBase64 => "/generate",
            GeneratorContract::InlineBase64 => "/model/create",
        }
    }

    pub fn streams_response(&self) -> bool {
        matches!(self, GeneratorContract::PathStream)
    }

    pub fn accept(&self) -> &'static str {
        if self.streams_response() {
            "model/gltf-binary"
        } else {
            "application/json"
        }
    }
}

impl FromStr for GeneratorContract {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path-stream" => Ok(GeneratorContract::PathStream),
            "path-base64" => Ok(GeneratorContract::PathBase64),
            "inline-base64" => Ok(GeneratorContract::InlineBase64),
            _ => Err(format!("Invalid generator contract: {}", s)),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        // Loads .env.{environment} and reads HOST / PORT
        let common = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let default_generator_url = format!("{}:{}", common.host, DEFAULT_GENERATOR_PORT);
        let generator_url = get_env("GENERATOR_URL", Some(&default_generator_url), is_prod)?;

        Ok(RelayConfig {
            generator: GeneratorConfig {
                url: normalize_base_url(&generator_url),
                contract: get_env("GENERATOR_CONTRACT", Some("path-stream"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                connect_timeout_secs: get_optional_parsed("GENERATOR_CONNECT_TIMEOUT_SECS")?,
            },
            upload: UploadConfig {
                max_file_size_bytes: get_optional_parsed("UPLOAD_MAX_FILE_SIZE_BYTES")?
                    .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
                max_request_bytes: get_optional_parsed("UPLOAD_MAX_REQUEST_BYTES")?,
                temp_dir: env::var("UPLOAD_TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
            },
            cors: CorsConfig {
                enabled: get_optional_parsed("CORS_ENABLED")?.unwrap_or(true),
            },
            telemetry: TelemetryConfig {
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
            common,
        })
    }
}

/// Accept `host:port` style values by assuming plain HTTP.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match (env::var(key), default) {
        (Ok(val), _) => Ok(val),
        (Err(_), Some(def)) => Ok(def.to_string()),
        (Err(_), None) if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        (Err(_), None) => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required but not set",
            key
        ))),
    }
}

fn get_optional_parsed<T: FromStr>(key: &str) -> Result<Option<T>, AppError> {
    match env::var(key) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, val))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn normalize_adds_scheme_to_host_port() {
        assert_eq!(normalize_base_url("localhost:5000"), "http://localhost:5000");
    }

    #[test]
    fn normalize_keeps_scheme_and_trims_slash() {
        assert_eq!(
            normalize_base_url("https://gen.internal:8443/"),
            "https://gen.internal:8443"
        );
    }

    #[test]
    fn contract_paths_match_generator_routes() {
        assert_eq!(GeneratorContract::PathStream.path(), "/generate");
        assert_eq!(GeneratorContract::PathBase64.path(), "/generate");
        assert_eq!(GeneratorContract::InlineBase64.path(), "/model/create");
    }

    #[test]
    fn only_path_stream_streams() {
        assert!(GeneratorContract::PathStream.streams_response());
        assert!(!GeneratorContract::PathBase64.streams_response());
        assert!(!GeneratorContract::InlineBase64.streams_response());
        assert_eq!(GeneratorContract::PathBase64.accept(), "application/json");
    }

    #[test]
    fn contract_parses_case_insensitively() {
        assert_eq!(
            "Inline-Base64".parse::<GeneratorContract>().unwrap(),
            GeneratorContract::InlineBase64
        );
        assert!("grpc".parse::<GeneratorContract>().is_err());
    }

    #[test]
    fn endpoint_joins_base_url_and_contract_path() {
        let generator = GeneratorConfig {
            url: normalize_base_url("localhost:5000/"),
            contract: GeneratorContract::InlineBase64,
            connect_timeout_secs: None,
        };
        assert_eq!(generator.endpoint(), "http://localhost:5000/model/create");
    }

    #[test]
    fn default_contract_is_path_stream() {
        assert_eq!(GeneratorContract::default(), GeneratorContract::PathStream);
    }

    #[test]
    fn get_env_falls_back_to_default_in_production() {
        env::remove_var("RELAY_TEST_UNSET_KEY");
        assert_eq!(
            get_env("RELAY_TEST_UNSET_KEY", Some("fallback"), true).unwrap(),
            "fallback"
        );
        assert!(get_env("RELAY_TEST_UNSET_KEY", None, true).is_err());
        assert!(get_env("RELAY_TEST_UNSET_KEY", None, false).is_err());
    }

    #[test]
    #[serial]
    fn production_load_uses_generator_defaults() {
        env::set_var("NODE_ENV", "production");
        env::remove_var("ENVIRONMENT");
        env::remove_var("GENERATOR_URL");
        env::remove_var("GENERATOR_CONTRACT");
        env::remove_var("UPLOAD_MAX_REQUEST_BYTES");
        env::set_var("HOST", "gen-host");

        let config = RelayConfig::load();

        env::remove_var("NODE_ENV");
        env::remove_var("HOST");

        let config = config.unwrap();
        assert_eq!(config.generator.url, "http://gen-host:5000");
        assert_eq!(config.generator.contract, GeneratorContract::PathStream);
        assert_eq!(config.upload.max_request_bytes, None);
    }
}
