//! Inference orchestration with graceful fallback

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fallback::FallbackSimulator;
use image::RgbaImage;
use image_preprocess::PreparedTensor;
use model_registry::ModelConfig;
use output_decoder::{encode_png, OutputDecoder, OutputTensor};
use serde::Serialize;
use tensor_validator::{RangeWarning, Validator};
use tracing::{debug, error, info, warn};

use crate::cache::SessionCache;
use crate::session::{ModelSession, SessionLoader};
use crate::{InferenceError, RunError};

/// Which path produced the final image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPath {
    Inference,
    Fallback,
}

impl ExecutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Inference => "inference",
            ExecutionPath::Fallback => "fallback",
        }
    }
}

/// How a request was served
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The model ran; raw tensors kept for diagnostics
    Inference {
        input: Arc<PreparedTensor>,
        output: OutputTensor,
    },
    /// The simulator ran instead; `reason` is what stopped the model path
    Fallback { reason: InferenceError },
}

/// Result of one style-transfer request
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// PNG-encoded final image
    pub png: Vec<u8>,
    /// Final image width
    pub width: u32,
    /// Final image height
    pub height: u32,
    /// Time spent producing the result
    pub elapsed: Duration,
    /// Range warnings raised while validating the input
    pub warnings: Vec<RangeWarning>,
    /// Path taken
    pub outcome: Outcome,
}

impl InferenceResult {
    pub fn path(&self) -> ExecutionPath {
        match self.outcome {
            Outcome::Inference { .. } => ExecutionPath::Inference,
            Outcome::Fallback { .. } => ExecutionPath::Fallback,
        }
    }

    /// Message explaining why the fallback path was used
    pub fn fallback_reason(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Fallback { reason } => Some(reason.to_string()),
            Outcome::Inference { .. } => None,
        }
    }
}

/// Runs tensors through cached sessions, falling back on any failure
pub struct Orchestrator<L: SessionLoader> {
    cache: SessionCache<L>,
    model_dir: PathBuf,
    validator: Validator,
    decoder: OutputDecoder,
    fallback: FallbackSimulator,
}

impl<L: SessionLoader> Orchestrator<L> {
    /// Create an orchestrator resolving model files under `model_dir`
    pub fn new(loader: L, model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        info!("Creating inference orchestrator with model dir {}", model_dir.display());
        Self {
            cache: SessionCache::new(loader),
            model_dir,
            validator: Validator::default(),
            decoder: OutputDecoder::new(),
            fallback: FallbackSimulator::new(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn cache(&self) -> &SessionCache<L> {
        &self.cache
    }

    /// Location of a model's file
    pub fn model_path(&self, model: &ModelConfig) -> PathBuf {
        self.model_dir.join(&model.file)
    }

    /// Release every cached session
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Produce an image for `tensor` in the style of `model`.
    ///
    /// Only a fallback refused by the style's category or an encoding
    /// failure is returned as an error.
    pub async fn run(
        &self,
        tensor: PreparedTensor,
        model: &ModelConfig,
    ) -> Result<InferenceResult, RunError> {
        let start = Instant::now();
        let tensor = Arc::new(tensor);

        let report = match self.validator.validate(&tensor, model) {
            Ok(report) => report,
            Err(e) => return self.fall_back(tensor, model, e.into(), Vec::new(), start),
        };

        match self.infer(&tensor, model).await {
            Ok((output, image)) => {
                let png = encode(&image)?;
                let elapsed = start.elapsed();
                info!(
                    "Style {} applied via inference in {}ms",
                    model.id,
                    elapsed.as_millis()
                );
                Ok(InferenceResult {
                    png,
                    width: image.width(),
                    height: image.height(),
                    elapsed,
                    warnings: report.warnings,
                    outcome: Outcome::Inference {
                        input: tensor,
                        output,
                    },
                })
            }
            Err(reason) => self.fall_back(tensor, model, reason, report.warnings, start),
        }
    }

    async fn infer(
        &self,
        tensor: &Arc<PreparedTensor>,
        model: &ModelConfig,
    ) -> Result<(OutputTensor, RgbaImage), InferenceError> {
        let path = self.model_path(model);
        let session = self.cache.get_or_load(&path, model).await?;

        let input_name = session
            .input_names()
            .first()
            .cloned()
            .ok_or_else(|| InferenceError::Runtime("model declares no inputs".to_string()))?;

        let task_tensor = Arc::clone(tensor);
        let outputs = tokio::task::spawn_blocking(move || session.run(&input_name, &task_tensor))
            .await
            .map_err(|e| InferenceError::Runtime(format!("inference task failed: {}", e)))??;

        debug!("Model {} produced {} outputs", model.id, outputs.len());
        let output = outputs
            .into_iter()
            .next()
            .ok_or(InferenceError::MissingOutput)?;
        let image = self.decoder.decode(&output, model)?;

        Ok((output, image))
    }

    fn fall_back(
        &self,
        tensor: Arc<PreparedTensor>,
        model: &ModelConfig,
        reason: InferenceError,
        warnings: Vec<RangeWarning>,
        start: Instant,
    ) -> Result<InferenceResult, RunError> {
        if !self.fallback.supports(model.category) {
            error!(
                "Style {} ({}) has no fallback: {}",
                model.id,
                model.category.as_str(),
                reason
            );
            return Err(RunError::UnsupportedFallback {
                style: model.id.clone(),
                reason,
            });
        }

        warn!("Inference unavailable for {}, using fallback: {}", model.id, reason);
        let image = self.fallback.render(&tensor, &model.display_name);
        let png = encode(&image)?;

        Ok(InferenceResult {
            png,
            width: image.width(),
            height: image.height(),
            elapsed: start.elapsed(),
            warnings,
            outcome: Outcome::Fallback { reason },
        })
    }
}

fn encode(image: &RgbaImage) -> Result<Vec<u8>, RunError> {
    encode_png(image).map_err(|e| RunError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EchoBehavior, EchoLoader};
    use crate::TractLoader;
    use image::{DynamicImage, Rgb, RgbImage};
    use image_preprocess::{PreprocessingConfig, PreprocessingOptions, Preprocessor};
    use model_registry::{ModelRegistry, NormalizationScheme, TensorLayout};
    use tensor_validator::ValidationError;

    fn model(id: &str) -> ModelConfig {
        ModelRegistry::builtin().lookup(id).unwrap().clone()
    }

    fn prepared(model: &ModelConfig) -> PreparedTensor {
        let photo = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }));
        let config = PreprocessingConfig::for_model(model, &PreprocessingOptions::default());
        Preprocessor::new(config).prepare(&photo).unwrap()
    }

    fn decoded_size(png: &[u8]) -> (u32, u32) {
        let image = image::load_from_memory(png).unwrap();
        (image.width(), image.height())
    }

    #[tokio::test]
    async fn test_inference_path() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("starry-night");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();

        assert_eq!(result.path(), ExecutionPath::Inference);
        assert_eq!((result.width, result.height), (256, 256));
        assert_eq!(decoded_size(&result.png), (256, 256));
        assert!(result.fallback_reason().is_none());
        match &result.outcome {
            Outcome::Inference { input, output } => {
                assert_eq!(input.shape, [1, 256, 256, 3]);
                assert_eq!(output.shape, vec![1, 256, 256, 3]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_planar_model_inference_path() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("mosaic");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();

        assert_eq!(result.path(), ExecutionPath::Inference);
        assert_eq!((result.width, result.height), (224, 224));
    }

    #[tokio::test]
    async fn test_shape_mismatch_falls_back_without_loading() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("starry-night");
        let tensor = PreparedTensor::new(
            vec![0.0; 128 * 128 * 3],
            128,
            128,
            TensorLayout::Nhwc,
            NormalizationScheme::Symmetric,
        );

        let result = orchestrator.run(tensor, &model).await.unwrap();

        assert_eq!(result.path(), ExecutionPath::Fallback);
        assert!(matches!(
            result.outcome,
            Outcome::Fallback {
                reason: InferenceError::ShapeMismatch(ValidationError::ShapeMismatch { .. })
            }
        ));
        assert_eq!(decoded_size(&result.png), (128, 128));
        assert_eq!(orchestrator.cache().loader().load_count(), 0);
    }

    #[tokio::test]
    async fn test_truncated_tensor_falls_back() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("starry-night");
        let mut tensor = prepared(&model);
        tensor.data.truncate(1000);

        let result = orchestrator.run(tensor, &model).await.unwrap();

        assert!(matches!(
            result.outcome,
            Outcome::Fallback {
                reason: InferenceError::ShapeMismatch(ValidationError::DataLength { .. })
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_model_file_falls_back() {
        let orchestrator = Orchestrator::new(TractLoader::new(), "/nonexistent/model/dir");
        let model = model("starry-night");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();

        assert_eq!(result.path(), ExecutionPath::Fallback);
        let reason = result.fallback_reason().unwrap();
        assert!(!reason.is_empty());
        assert!(reason.contains("starry_night.onnx"));
        let (w, h) = decoded_size(&result.png);
        assert!(w >= 1 && h >= 1);
        assert!(orchestrator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_runtime_failure_falls_back() {
        let loader = EchoLoader::new().with_behavior(EchoBehavior::Fail);
        let orchestrator = Orchestrator::new(loader, "models");
        let model = model("candy");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();

        assert!(matches!(
            result.outcome,
            Outcome::Fallback {
                reason: InferenceError::Runtime(_)
            }
        ));
        assert_eq!((result.width, result.height), (224, 224));
    }

    #[tokio::test]
    async fn test_no_outputs_falls_back() {
        let loader = EchoLoader::new().with_behavior(EchoBehavior::NoOutputs);
        let orchestrator = Orchestrator::new(loader, "models");
        let model = model("pencil-sketch");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();

        assert!(matches!(
            result.outcome,
            Outcome::Fallback {
                reason: InferenceError::MissingOutput
            }
        ));
    }

    #[tokio::test]
    async fn test_anime_refuses_fallback() {
        let orchestrator = Orchestrator::new(EchoLoader::failing(), "models");
        let model = model("anime");

        let err = orchestrator.run(prepared(&model), &model).await.unwrap_err();

        match err {
            RunError::UnsupportedFallback { style, reason } => {
                assert_eq!(style, "anime");
                assert!(matches!(reason, InferenceError::ModelLoad { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_anime_succeeds_with_inference() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("anime");

        let result = orchestrator.run(prepared(&model), &model).await.unwrap();
        assert_eq!(result.path(), ExecutionPath::Inference);
    }

    #[tokio::test]
    async fn test_sessions_reused_across_runs() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("starry-night");

        orchestrator.run(prepared(&model), &model).await.unwrap();
        orchestrator.run(prepared(&model), &model).await.unwrap();
        assert_eq!(orchestrator.cache().loader().load_count(), 1);
        assert!(orchestrator.cache().contains(&orchestrator.model_path(&model)));

        assert_eq!(orchestrator.clear_cache(), 1);
        orchestrator.run(prepared(&model), &model).await.unwrap();
        assert_eq!(orchestrator.cache().loader().load_count(), 2);
    }

    #[tokio::test]
    async fn test_range_warnings_carried() {
        let orchestrator = Orchestrator::new(EchoLoader::new(), "models");
        let model = model("starry-night");
        let mut tensor = prepared(&model);
        tensor.max = 4.0;

        let result = orchestrator.run(tensor, &model).await.unwrap();

        assert_eq!(result.path(), ExecutionPath::Inference);
        assert_eq!(result.warnings.len(), 1);
    }
}
