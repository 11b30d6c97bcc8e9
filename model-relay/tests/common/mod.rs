#![allow(dead_code)]

use model_relay::config::{
    CorsConfig, GeneratorConfig, GeneratorContract, RelayConfig, TelemetryConfig, UploadConfig,
};
use model_relay::startup::Application;
use reqwest::multipart;
use service_core::config::Config as CoreConfig;

pub const LEFT_IMAGE: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const RIGHT_IMAGE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00];
pub const GLB_MODEL: &[u8] = b"glTF\x02\x00\x00\x00\x2c\x00\x00\x00JSON{}";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

pub fn test_config(generator_url: &str, contract: GeneratorContract) -> RelayConfig {
    RelayConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port for testing
        },
        generator: GeneratorConfig {
            url: generator_url.to_string(),
            contract,
            connect_timeout_secs: Some(5),
        },
        upload: UploadConfig {
            max_file_size_bytes: 1024,
            max_request_bytes: None,
            temp_dir: std::env::temp_dir(),
        },
        cors: CorsConfig { enabled: true },
        telemetry: TelemetryConfig {
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
    }
}

impl TestApp {
    pub async fn spawn(generator_url: &str, contract: GeneratorContract) -> Self {
        Self::spawn_with(test_config(generator_url, contract)).await
    }

    pub async fn spawn_with(config: RelayConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn post_images(&self, images: &[&[u8]]) -> reqwest::Response {
        self.post_form("/model/create", image_form(images)).await
    }

    pub async fn post_form(&self, path: &str, form: multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Multipart form with one `images` part per entry.
pub fn image_form(images: &[&[u8]]) -> multipart::Form {
    images
        .iter()
        .enumerate()
        .fold(multipart::Form::new(), |form, (i, bytes)| {
            form.part(
                "images",
                multipart::Part::bytes(bytes.to_vec())
                    .file_name(format!("view-{}.jpg", i))
                    .mime_str("image/jpeg")
                    .unwrap(),
            )
        })
}

/// A local URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Spawn against a private spool directory so cleanup can be checked.
pub async fn spawn_with_spool_dir(
    generator_url: &str,
    contract: GeneratorContract,
) -> (TestApp, tempfile::TempDir) {
    let spool = tempfile::tempdir().expect("Failed to create spool dir");
    let mut config = test_config(generator_url, contract);
    config.upload.temp_dir = spool.path().to_path_buf();
    (TestApp::spawn_with(config).await, spool)
}

/// Poll until the directory has no entries left.
pub async fn wait_until_empty(dir: &std::path::Path) -> bool {
    for _ in 0..100 {
        let remaining = std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0);
        if remaining == 0 {
            return true;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    false
}

/// Poll until none of the given paths exist.
pub async fn wait_until_removed(paths: &[String]) -> bool {
    for _ in 0..50 {
        if paths.iter().all(|p| !std::path::Path::new(p).exists()) {
            return true;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }
    false
}
