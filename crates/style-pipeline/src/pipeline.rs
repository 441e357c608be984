//! Request entry point tying preprocessing, inference and fallback together

use std::time::Instant;

use image::DynamicImage;
use image_preprocess::{PreparedTensor, PreprocessingConfig, PreprocessingOptions, Preprocessor};
use inference_engine::{InferenceResult, Orchestrator, SessionLoader, TractLoader};
use metrics::{counter, histogram};
use model_registry::{ModelConfig, ModelRegistry};
use tracing::{debug, info, warn};

use crate::settings::PipelineSettings;
use crate::PipelineError;

/// Everything one caller needs to serve style-transfer requests.
///
/// Each context owns its own session cache; contexts never share state.
pub struct PipelineContext<L: SessionLoader = TractLoader> {
    settings: PipelineSettings,
    registry: ModelRegistry,
    orchestrator: Orchestrator<L>,
}

impl PipelineContext<TractLoader> {
    /// Context backed by tract sessions and the builtin styles
    pub fn new(settings: PipelineSettings) -> Self {
        Self::with_loader(settings, TractLoader::new())
    }
}

impl<L: SessionLoader> PipelineContext<L> {
    pub fn with_loader(settings: PipelineSettings, loader: L) -> Self {
        let orchestrator = Orchestrator::new(loader, settings.model_dir.clone());
        Self {
            settings,
            registry: ModelRegistry::builtin(),
            orchestrator,
        }
    }

    /// Replace the style catalogue
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Stylize a decoded image
    pub async fn transfer_style(
        &self,
        image: &DynamicImage,
        style_id: &str,
        options: &PreprocessingOptions,
    ) -> Result<InferenceResult, PipelineError> {
        let start = Instant::now();
        let model = self.model(style_id)?;
        let preprocessor = self.preprocessor(model, options);

        let tensor = preprocessor.prepare(image)?;
        self.execute(tensor, model, start).await
    }

    /// Stylize encoded bytes, rejecting formats the style does not accept
    pub async fn transfer_style_bytes(
        &self,
        bytes: &[u8],
        style_id: &str,
        options: &PreprocessingOptions,
    ) -> Result<InferenceResult, PipelineError> {
        let start = Instant::now();
        let model = self.model(style_id)?;
        let preprocessor = self.preprocessor(model, options);

        let tensor = preprocessor.prepare_bytes(bytes, &model.accepted_formats)?;
        self.execute(tensor, model, start).await
    }

    /// Release all cached sessions; returns how many were dropped
    pub fn clear_cache(&self) -> usize {
        self.orchestrator.clear_cache()
    }

    /// Number of currently loaded sessions
    pub fn cached_sessions(&self) -> usize {
        self.orchestrator.cache().len()
    }

    pub fn orchestrator(&self) -> &Orchestrator<L> {
        &self.orchestrator
    }

    fn model(&self, style_id: &str) -> Result<&ModelConfig, PipelineError> {
        self.registry.get(style_id).ok_or_else(|| {
            warn!("Rejected request for unknown style {}", style_id);
            counter!("style_transfer_rejected_total", "reason" => "unknown_style").increment(1);
            PipelineError::UnknownStyle(style_id.to_string())
        })
    }

    fn preprocessor(&self, model: &ModelConfig, options: &PreprocessingOptions) -> Preprocessor {
        let options = PreprocessingOptions {
            interpolation: options.interpolation.or(Some(self.settings.interpolation)),
            pad_color: options.pad_color.or(Some(self.settings.pad_color)),
            ..options.clone()
        };
        Preprocessor::new(PreprocessingConfig::for_model(model, &options))
    }

    async fn execute(
        &self,
        tensor: PreparedTensor,
        model: &ModelConfig,
        start: Instant,
    ) -> Result<InferenceResult, PipelineError> {
        debug!(
            "Prepared {}x{} tensor for {} in {}ms",
            tensor.width,
            tensor.height,
            model.id,
            start.elapsed().as_millis()
        );

        let mut result = match self.orchestrator.run(tensor, model).await {
            Ok(result) => result,
            Err(e) => {
                counter!("style_transfer_rejected_total", "reason" => "run").increment(1);
                return Err(e.into());
            }
        };

        let path = result.path().as_str();
        let elapsed = start.elapsed();
        // Report the whole request, preprocessing included
        result.elapsed = elapsed;
        counter!("style_transfer_requests_total", "style" => model.id.clone(), "path" => path)
            .increment(1);
        histogram!("style_transfer_duration_seconds", "path" => path).record(elapsed.as_secs_f64());

        info!(
            "Style {} served via {} ({}x{}) in {}ms",
            model.id,
            path,
            result.width,
            result.height,
            elapsed.as_millis()
        );
        Ok(result)
    }
}
