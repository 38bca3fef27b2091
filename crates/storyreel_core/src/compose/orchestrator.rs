//! The encode orchestrator.
//!
//! `Compositor` owns the process-wide engine handle and runs each
//! composition request as a one-shot, stateless job: filter renderable
//! scenes, ensure the engine is ready, stage inputs, issue the single
//! encode command, read the artifact back, and purge staged files on
//! every exit path.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::engine::{bootstrap, EncodeJob, Engine, EngineError, HttpFetcher, SourceFetcher};
use crate::graph::{FilterGraph, GraphOptions, SceneInput, TransitionSpec};
use crate::models::{
    sanitize_file_name, Artifact, ColorGradeStyle, CompositionRequest, Scene, SceneImage, Stage,
};
use crate::timing;

use super::cancel::CancelHandle;
use super::errors::ComposeError;
use super::progress::ProgressSink;
use super::staging;

/// Percent at which staging begins (bootstrap milestones end at 25).
const STAGING_BASE: u8 = 25;
/// Percent at which encoding begins; the encode occupies the back 60%.
const ENCODE_BASE: u8 = 40;

/// Scene-to-video compositor with a lazily bootstrapped, process-wide
/// engine handle.
///
/// Concurrent `compose` calls coalesce on one in-flight engine
/// initialization; a failed bootstrap leaves the handle unset so the
/// next call retries from scratch.
pub struct Compositor {
    settings: Settings,
    fetcher: Arc<dyn SourceFetcher>,
    engine: OnceCell<Arc<dyn Engine>>,
}

impl Compositor {
    /// Create a compositor with the default HTTP fetcher.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fetcher: Arc::new(HttpFetcher::new()),
            engine: OnceCell::new(),
        }
    }

    /// Replace the source fetcher (tests, proxied environments).
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Pre-set the engine handle, bypassing bootstrap entirely.
    pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = OnceCell::new_with(Some(engine));
        self
    }

    /// Whether the engine handle is currently loaded.
    pub fn is_engine_ready(&self) -> bool {
        self.engine.initialized()
    }

    /// Ensure the encoding engine is ready, bootstrapping it if needed.
    ///
    /// Idempotent and safe to call concurrently: later callers await
    /// the same in-flight initialization rather than starting a second
    /// one. Emits the bootstrap progress milestones through `progress`.
    pub async fn ensure_engine_ready(
        &self,
        progress: &ProgressSink,
    ) -> Result<Arc<dyn Engine>, ComposeError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let report = |percent: u8, message: &str| {
                    progress.emit(Stage::Bootstrapping, percent, message);
                };
                let engine =
                    bootstrap(&self.settings.engine, self.fetcher.as_ref(), &report).await?;
                Ok::<_, ComposeError>(Arc::new(engine) as Arc<dyn Engine>)
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Compose the request into a single video artifact.
    ///
    /// Emits at least one progress record per stage transition; the
    /// terminal record is `Finished` or `Failed`. Staged working files
    /// are removed on every exit path, success or failure.
    pub async fn compose(
        &self,
        request: &CompositionRequest,
        progress: &ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<Artifact, ComposeError> {
        progress.reset();
        let result = self.compose_inner(request, progress, cancel).await;
        match &result {
            Ok(artifact) => {
                info!(
                    "composed '{}': {:.2}s, {} bytes",
                    artifact.file_name,
                    artifact.duration_seconds,
                    artifact.bytes.len()
                );
                progress.emit(
                    Stage::Finished,
                    100,
                    format!("finished {}", artifact.file_name),
                );
            }
            Err(err) => {
                warn!("composition failed: {err}");
                progress.emit(Stage::Failed, 0, err.to_string());
            }
        }
        result
    }

    async fn compose_inner(
        &self,
        request: &CompositionRequest,
        progress: &ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<Artifact, ComposeError> {
        request.validate()?;

        let renderable = request.renderable_scenes();
        if renderable.is_empty() {
            return Err(ComposeError::NoRenderableScenes);
        }
        if cancel.is_cancelled() {
            return Err(ComposeError::Cancelled);
        }

        progress.emit(Stage::Bootstrapping, 0, "starting composition");
        let engine = self.ensure_engine_ready(progress).await?;

        let run_id = staging::next_run_id();
        let mut staged: Vec<String> = Vec::new();

        let outcome = self
            .stage_and_encode(request, &renderable, &run_id, engine.as_ref(), &mut staged, progress, cancel)
            .await;

        // Best-effort purge of everything this run put into working
        // storage; the artifact bytes are already in memory.
        for name in &staged {
            if let Err(err) = engine.remove_file(name).await {
                debug!("cleanup: could not remove staged file '{name}': {err}");
            }
        }

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn stage_and_encode(
        &self,
        request: &CompositionRequest,
        renderable: &[&Scene],
        run_id: &str,
        engine: &dyn Engine,
        staged: &mut Vec<String>,
        progress: &ProgressSink,
        cancel: &CancelHandle,
    ) -> Result<Artifact, ComposeError> {
        let total = renderable.len();
        let mut inputs: Vec<SceneInput> = Vec::with_capacity(total);

        for (position, scene) in renderable.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ComposeError::Cancelled);
            }
            let (bytes, extension) =
                self.resolve_image(scene)
                    .await
                    .map_err(|message| ComposeError::Staging {
                        scene_index: scene.index,
                        message,
                    })?;
            let name = staging::staged_name(run_id, position, extension);
            engine
                .stage_input(&name, &bytes)
                .await
                .map_err(|err| ComposeError::Staging {
                    scene_index: scene.index,
                    message: err.to_string(),
                })?;
            staged.push(name.clone());
            inputs.push(SceneInput {
                file_name: name,
                duration_seconds: scene.duration_seconds,
            });

            let span = u32::from(ENCODE_BASE - STAGING_BASE);
            let percent =
                STAGING_BASE + (span * (position as u32 + 1) / total as u32) as u8;
            progress.emit_scene(
                Stage::StagingInputs,
                percent,
                format!("staged scene {} of {}", position + 1, total),
                Some(position as u32 + 1),
                Some(total as u32),
            );
        }

        let transition = if request.transition_enabled && inputs.len() > 1 {
            Some(TransitionSpec {
                style: request.transition_style,
                duration_seconds: request.transition_duration_seconds,
            })
        } else {
            None
        };

        let (width, height) = request.resolution.dimensions();
        let options = GraphOptions {
            width,
            height,
            frame_rate: request.frame_rate,
            motion_enabled: request.motion_enabled,
            grade: if request.color_grade_enabled {
                request.color_grade_style
            } else {
                ColorGradeStyle::None
            },
            transition,
        };
        let graph = FilterGraph::build(&inputs, &options);
        let rendered = graph.render();

        let durations: Vec<f64> = inputs.iter().map(|i| i.duration_seconds).collect();
        let duration_seconds =
            timing::total_duration(&durations, transition.map(|t| t.duration_seconds));

        let file_name = format!(
            "{}.{}",
            sanitize_file_name(&request.project_name),
            self.settings.output.container
        );
        let output_name = format!("{run_id}_{file_name}");
        // The output lives in the same flat namespace and is purged
        // with the inputs once its bytes are read back.
        staged.push(output_name.clone());

        let job = EncodeJob {
            inputs: graph.inputs.clone(),
            filter_complex: rendered.filter_complex,
            output_label: rendered.output_label,
            output_name: output_name.clone(),
            frame_rate: request.frame_rate,
            total_duration_seconds: duration_seconds,
            video: self.settings.output.clone(),
        };

        progress.emit(Stage::Encoding, ENCODE_BASE, "encoding video");
        let encode_progress = |fraction: f64| {
            let span = f64::from(100 - ENCODE_BASE);
            let percent = ENCODE_BASE + (fraction.clamp(0.0, 1.0) * span) as u8;
            progress.emit(Stage::Encoding, percent, "encoding video");
        };

        let encode = tokio::time::timeout(
            self.settings.output.encode_timeout(),
            engine.run_encode(&job, &encode_progress, cancel),
        )
        .await;
        match encode {
            Err(_) => {
                return Err(ComposeError::Encode(format!(
                    "encode timed out after {}s",
                    self.settings.output.encode_timeout_secs
                )))
            }
            Ok(Err(EngineError::Cancelled)) => return Err(ComposeError::Cancelled),
            Ok(Err(err)) => return Err(ComposeError::Encode(err.to_string())),
            Ok(Ok(())) => {}
        }

        let bytes = engine
            .read_file(&output_name)
            .await
            .map_err(|err| ComposeError::Encode(format!("failed to read output: {err}")))?;

        Ok(Artifact {
            file_name,
            content_type: content_type_for(&self.settings.output.container),
            bytes,
            duration_seconds,
        })
    }

    /// Materialize a scene's image bytes from whichever reference form
    /// it carries.
    async fn resolve_image(&self, scene: &Scene) -> Result<(Vec<u8>, &'static str), String> {
        match &scene.source_image {
            SceneImage::DataUri(uri) => staging::decode_data_uri(uri),
            SceneImage::Url(url) => {
                let bytes = self
                    .fetcher
                    .fetch(url, self.settings.engine.image_fetch_timeout())
                    .await
                    .map_err(|err| err.to_string())?;
                Ok((bytes, staging::extension_for_location(url)))
            }
            SceneImage::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|err| format!("could not read '{}': {err}", path.display()))?;
                Ok((bytes, staging::extension_for_location(&path.to_string_lossy())))
            }
            SceneImage::None => Err("scene has no image reference".to_string()),
        }
    }
}

fn content_type_for(container: &str) -> &'static str {
    match container {
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => "video/mp4",
    }
}
