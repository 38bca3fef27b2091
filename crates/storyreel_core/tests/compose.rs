//! End-to-end composition tests against an in-memory engine and a
//! canned source fetcher. No network, no ffmpeg binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use storyreel_core::compose::{CancelHandle, ComposeError, Compositor, ProgressSink};
use storyreel_core::config::{EngineSettings, EngineSource, Settings};
use storyreel_core::engine::{EncodeJob, Engine, EngineError, FetchError, SourceFetcher};
use storyreel_core::models::{
    CompositionProgress, CompositionRequest, Scene, SceneImage, Stage,
};

const FAKE_VIDEO: &[u8] = b"encoded-video-bytes";

/// Engine with flat in-memory storage and a scripted encode.
#[derive(Debug, Default)]
struct MockEngine {
    storage: Mutex<HashMap<String, Vec<u8>>>,
    fail_encode: AtomicBool,
    stage_calls: AtomicU32,
    encode_calls: AtomicU32,
}

impl MockEngine {
    fn file_count(&self) -> usize {
        self.storage.lock().len()
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.stage_calls.fetch_add(1, Ordering::SeqCst);
        self.storage.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.storage
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    async fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        self.storage
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    async fn run_encode(
        &self,
        job: &EncodeJob,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancelHandle,
    ) -> Result<(), EngineError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(EngineError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "simulated encoder failure".to_string(),
            });
        }
        progress(0.5);
        self.storage
            .lock()
            .insert(job.output_name.clone(), FAKE_VIDEO.to_vec());
        progress(1.0);
        Ok(())
    }
}

/// Fetcher serving canned responses from a URL map.
#[derive(Default)]
struct FakeFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeFetcher {
    fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.responses.lock().insert(url.to_string(), bytes);
    }

    fn calls_for(&self, url: &str) -> u32 {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;
        self.responses
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn data_uri_scene(index: u32, duration: f64) -> Scene {
    let payload = base64::engine::general_purpose::STANDARD.encode(b"fake-png-bytes");
    Scene {
        index,
        source_image: SceneImage::DataUri(format!("data:image/png;base64,{payload}")),
        narration_text: format!("scene {index}"),
        duration_seconds: duration,
    }
}

fn request(scenes: Vec<Scene>) -> CompositionRequest {
    CompositionRequest {
        scenes,
        project_name: "My Video".to_string(),
        frame_rate: 30,
        resolution: Default::default(),
        motion_enabled: true,
        transition_enabled: false,
        transition_style: Default::default(),
        transition_duration_seconds: 0.5,
        color_grade_enabled: false,
        color_grade_style: Default::default(),
    }
}

fn compositor_with(engine: Arc<MockEngine>) -> Compositor {
    Compositor::new(Settings::default()).with_engine(engine)
}

fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<CompositionProgress>>>) {
    let records: Arc<Mutex<Vec<CompositionProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_records = Arc::clone(&records);
    let sink = ProgressSink::new(Box::new(move |p| sink_records.lock().push(p)));
    (sink, records)
}

#[tokio::test]
async fn compose_produces_artifact_and_cleans_storage() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));
    let (sink, records) = recording_sink();

    let req = request(vec![
        data_uri_scene(1, 4.0),
        data_uri_scene(2, 3.0),
        data_uri_scene(3, 5.0),
    ]);
    let artifact = compositor
        .compose(&req, &sink, &CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(artifact.file_name, "My_Video.mp4");
    assert_eq!(artifact.content_type, "video/mp4");
    assert_eq!(artifact.bytes, FAKE_VIDEO);
    assert!((artifact.duration_seconds - 12.0).abs() < 1e-9);

    // Inputs and output both purged after the bytes are read back.
    assert_eq!(engine.file_count(), 0);
    assert_eq!(engine.stage_calls.load(Ordering::SeqCst), 3);

    let records = records.lock();
    let percents: Vec<u8> = records.iter().map(|r| r.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    let last = records.last().unwrap();
    assert_eq!(last.stage, Stage::Finished);
    assert_eq!(last.percent, 100);
    assert!(records.iter().any(|r| r.stage == Stage::StagingInputs
        && r.current_scene == Some(2)
        && r.total_scenes == Some(3)));
    assert!(records.iter().any(|r| r.stage == Stage::Encoding));
}

#[tokio::test]
async fn transitions_shorten_the_final_duration() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(engine);

    let mut req = request(vec![
        data_uri_scene(1, 4.0),
        data_uri_scene(2, 4.0),
        data_uri_scene(3, 4.0),
    ]);
    req.transition_enabled = true;
    req.transition_duration_seconds = 0.5;

    let artifact = compositor
        .compose(&req, &ProgressSink::noop(), &CancelHandle::new())
        .await
        .unwrap();

    // 12s of scenes minus two 0.5s overlaps.
    assert!((artifact.duration_seconds - 11.0).abs() < 1e-9);
}

#[tokio::test]
async fn encode_failure_surfaces_and_cleans_storage() {
    let engine = Arc::new(MockEngine::default());
    engine.fail_encode.store(true, Ordering::SeqCst);
    let compositor = compositor_with(Arc::clone(&engine));
    let (sink, records) = recording_sink();

    let req = request(vec![data_uri_scene(1, 3.0)]);
    let err = compositor
        .compose(&req, &sink, &CancelHandle::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::Encode(_)));
    assert!(err.to_string().contains("simulated encoder failure"));
    assert_eq!(engine.file_count(), 0);
    assert_eq!(records.lock().last().unwrap().stage, Stage::Failed);
}

#[tokio::test]
async fn skipping_imageless_scenes_still_renders_the_rest() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));

    let mut scenes = vec![data_uri_scene(1, 3.0), data_uri_scene(2, 2.0)];
    scenes[0].source_image = SceneImage::None;
    let req = request(scenes);

    let artifact = compositor
        .compose(&req, &ProgressSink::noop(), &CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(engine.stage_calls.load(Ordering::SeqCst), 1);
    assert!((artifact.duration_seconds - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn all_imageless_scenes_is_an_explicit_error() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));

    let mut scenes = vec![data_uri_scene(1, 3.0)];
    scenes[0].source_image = SceneImage::None;
    let err = compositor
        .compose(&request(scenes), &ProgressSink::noop(), &CancelHandle::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::NoRenderableScenes));
    assert_eq!(engine.stage_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_timing_rejected_before_any_engine_work() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));

    let mut req = request(vec![data_uri_scene(1, 4.0), data_uri_scene(2, 0.3)]);
    req.transition_enabled = true;
    req.transition_duration_seconds = 0.5;

    let err = compositor
        .compose(&req, &ProgressSink::noop(), &CancelHandle::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::InvalidConfiguration(_)));
    assert_eq!(engine.stage_calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.encode_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancellation_before_staging_short_circuits() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));

    let cancel = CancelHandle::new();
    cancel.cancel();
    let err = compositor
        .compose(
            &request(vec![data_uri_scene(1, 3.0)]),
            &ProgressSink::noop(),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::Cancelled));
    assert_eq!(engine.stage_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_data_uri_is_a_staging_error() {
    let engine = Arc::new(MockEngine::default());
    let compositor = compositor_with(Arc::clone(&engine));

    let mut scenes = vec![data_uri_scene(1, 3.0)];
    scenes[0].source_image = SceneImage::DataUri("data:image/png;base64,!!!".to_string());
    let err = compositor
        .compose(&request(scenes), &ProgressSink::noop(), &CancelHandle::new())
        .await
        .unwrap_err();

    match err {
        ComposeError::Staging { scene_index, .. } => assert_eq!(scene_index, 1),
        other => panic!("expected staging error, got {other}"),
    }
}

// --- bootstrap tests ---------------------------------------------------

/// Gzipped tarball containing a single `ffmpeg` file.
fn fake_payload() -> Vec<u8> {
    let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
        Vec::new(),
        flate2::Compression::fast(),
    ));
    let body = b"#!/bin/sh\nexit 0\n";
    let mut header = tar::Header::new_gnu();
    header.set_path("ffmpeg").unwrap();
    header.set_size(body.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append(&header, body.as_slice()).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn bootstrap_settings(install_dir: &std::path::Path) -> Settings {
    Settings {
        engine: EngineSettings {
            install_dir: Some(install_dir.to_path_buf()),
            sources: vec![
                EngineSource {
                    name: "primary".to_string(),
                    manifest_url: "https://primary.test/manifest.json".to_string(),
                    payload_url: "https://primary.test/engine.tar.gz".to_string(),
                },
                EngineSource {
                    name: "mirror".to_string(),
                    manifest_url: "https://mirror.test/manifest.json".to_string(),
                    payload_url: "https://mirror.test/engine.tar.gz".to_string(),
                },
            ],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn serve_engine(fetcher: &FakeFetcher, base: &str) {
    let payload = fake_payload();
    let manifest = format!(
        r#"{{"version":"7.1.0","binary":"ffmpeg","sha256":"{}"}}"#,
        sha256_hex(&payload)
    );
    fetcher.insert(&format!("{base}/manifest.json"), manifest.into_bytes());
    fetcher.insert(&format!("{base}/engine.tar.gz"), payload);
}

#[tokio::test]
async fn concurrent_bootstrap_coalesces_to_one_download() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    serve_engine(&fetcher, "https://primary.test");

    let compositor = Arc::new(
        Compositor::new(bootstrap_settings(dir.path())).with_fetcher(Arc::clone(&fetcher) as _),
    );

    let a = {
        let c = Arc::clone(&compositor);
        tokio::spawn(async move { c.ensure_engine_ready(&ProgressSink::noop()).await })
    };
    let b = {
        let c = Arc::clone(&compositor);
        tokio::spawn(async move { c.ensure_engine_ready(&ProgressSink::noop()).await })
    };
    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(fetcher.calls_for("https://primary.test/manifest.json"), 1);
    assert_eq!(fetcher.calls_for("https://primary.test/engine.tar.gz"), 1);
    assert!(compositor.is_engine_ready());
}

#[tokio::test]
async fn bootstrap_falls_back_to_the_next_source() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    // Primary serves nothing; only the mirror works.
    serve_engine(&fetcher, "https://mirror.test");

    let compositor =
        Compositor::new(bootstrap_settings(dir.path())).with_fetcher(Arc::clone(&fetcher) as _);

    compositor
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap();
    assert_eq!(fetcher.calls_for("https://primary.test/manifest.json"), 1);
    assert_eq!(fetcher.calls_for("https://mirror.test/manifest.json"), 1);
}

#[tokio::test]
async fn failed_bootstrap_aggregates_sources_and_allows_retry() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());

    let compositor =
        Compositor::new(bootstrap_settings(dir.path())).with_fetcher(Arc::clone(&fetcher) as _);

    let err = compositor
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ComposeError::EngineUnavailable(_)));
    assert!(message.contains("primary:"), "{message}");
    assert!(message.contains("mirror:"), "{message}");
    assert!(!compositor.is_engine_ready());

    // A later call starts over instead of caching the failure.
    serve_engine(&fetcher, "https://primary.test");
    compositor
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap();
    assert_eq!(fetcher.calls_for("https://primary.test/manifest.json"), 2);
    assert!(compositor.is_engine_ready());
}

#[tokio::test]
async fn checksum_mismatch_rejects_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let payload = fake_payload();
    fetcher.insert(
        "https://primary.test/manifest.json",
        br#"{"version":"7.1.0","binary":"ffmpeg","sha256":"deadbeef"}"#.to_vec(),
    );
    fetcher.insert("https://primary.test/engine.tar.gz", payload);

    let mut settings = bootstrap_settings(dir.path());
    settings.engine.sources.truncate(1);
    let compositor = Compositor::new(settings).with_fetcher(Arc::clone(&fetcher) as _);

    let err = compositor
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"), "{err}");
}

#[tokio::test]
async fn installed_engine_is_reused_without_refetching() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    serve_engine(&fetcher, "https://primary.test");

    let settings = bootstrap_settings(dir.path());
    let first =
        Compositor::new(settings.clone()).with_fetcher(Arc::clone(&fetcher) as _);
    first
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap();

    // A fresh compositor finds the install on disk.
    let second = Compositor::new(settings).with_fetcher(Arc::clone(&fetcher) as _);
    second
        .ensure_engine_ready(&ProgressSink::noop())
        .await
        .unwrap();
    assert_eq!(fetcher.calls_for("https://primary.test/manifest.json"), 1);
}
