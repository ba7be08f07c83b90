//! Shared helpers for the server integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use tortoise_server::audio::{AudioOutput, Waveform};
use tortoise_server::model::{ConditioningLatents, Generation, ModelHealth, Quality, SpeechModel};
use tortoise_server::server::{create_router, AppState, ServerConfig, ServerVariant};
use tortoise_server::synthesis::SynthesisBackend;
use tortoise_server::ModelError;

/// Speech model double that counts calls
#[derive(Default)]
pub struct MockModel {
    pub conditioning_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub fail_generation: bool,
}

impl MockModel {
    pub fn failing() -> Self {
        Self {
            fail_generation: true,
            ..Default::default()
        }
    }

    pub fn conditioning_calls(&self) -> usize {
        self.conditioning_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health(&self) -> Result<ModelHealth, ModelError> {
        Ok(ModelHealth {
            cuda_available: false,
        })
    }

    async fn conditioning_latents(
        &self,
        samples: &[Arc<Waveform>],
    ) -> Result<ConditioningLatents, ModelError> {
        self.conditioning_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConditioningLatents(vec![samples.len() as u8]))
    }

    async fn generate(
        &self,
        _text: &str,
        _latents: &ConditioningLatents,
        _preset: Quality,
    ) -> Result<Generation, ModelError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_generation {
            return Err(ModelError::Status {
                status: 500,
                message: "CUDA out of memory".to_string(),
            });
        }
        Ok(Generation {
            sample_rate: 24000,
            chunks: vec![Some(vec![0.1; 12000]), None, Some(vec![-0.1; 12000])],
        })
    }
}

/// A router over a fresh temp directory
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn simulation() -> Self {
        Self::build(ServerVariant::Enhanced, None, |_| {}).await
    }

    pub async fn with_model(variant: ServerVariant, model: Arc<MockModel>) -> Self {
        Self::build(variant, Some(model), |_| {}).await
    }

    pub async fn build(
        variant: ServerVariant,
        model: Option<Arc<MockModel>>,
        customize: impl FnOnce(&mut ServerConfig),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.variant = variant;
        config.storage.temp_dir = dir.path().to_path_buf();
        config.logging.access_log = false;
        customize(&mut config);

        let model = model.map(|m| m as Arc<dyn SpeechModel>);
        let backend = SynthesisBackend::select(model).await;
        let state = Arc::new(AppState::new(config, backend));
        let router = create_router(state.clone());

        Self { router, state, dir }
    }

    pub fn temp_path(&self) -> &Path {
        self.dir.path()
    }

    /// Files the registry says `voice_id` owns
    pub fn files_of(&self, voice_id: &str) -> Vec<PathBuf> {
        self.state.registry.get(voice_id).unwrap().files.clone()
    }

    /// Names of the plain files directly under `dir`
    pub fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Clone a voice from the given `(filename, bytes)` samples
    pub async fn clone_voice(&self, voice_name: &str, samples: &[(&str, Vec<u8>)]) -> TestResponse {
        let mut form = MultipartForm::new()
            .text("user_id", "tester")
            .text("voice_name", voice_name);
        for (i, (filename, bytes)) in samples.iter().enumerate() {
            form = form.file(&format!("voice_sample_{}", i), filename, bytes);
        }
        self.send(form.into_request("/clone_voice_instant")).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sample rate and sample count of a WAV body
    pub fn wav_info(&self) -> (u32, u32) {
        let reader = hound::WavReader::new(std::io::Cursor::new(self.body.clone())).unwrap();
        (reader.spec().sample_rate, reader.duration())
    }
}

/// Hand-built multipart/form-data body
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "tortoise-test-boundary-7MA4YWxk".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A short 16-bit WAV at `sample_rate`
pub fn wav_bytes(seconds: f32, sample_rate: u32) -> Vec<u8> {
    let n = (seconds * sample_rate as f32) as usize;
    let samples: Vec<f32> = (0..n)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / sample_rate as f32).sin() * 0.5)
        .collect();
    AudioOutput::encode(&samples, sample_rate).unwrap()
}
