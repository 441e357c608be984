//! ONNX backend using tract

use std::fmt;
use std::path::Path;

use image_preprocess::PreparedTensor;
use model_registry::ModelConfig;
use output_decoder::OutputTensor;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::session::{ModelSession, SessionLoader};
use crate::InferenceError;

type RunFn = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync>;

/// Loads ONNX files into optimized tract plans
#[derive(Debug, Default, Clone, Copy)]
pub struct TractLoader;

impl TractLoader {
    pub fn new() -> Self {
        Self
    }
}

impl SessionLoader for TractLoader {
    type Session = TractSession;

    async fn load(&self, path: &Path, model: &ModelConfig) -> Result<TractSession, InferenceError> {
        let load_error = |reason: String| InferenceError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(load_error("not a regular file".to_string())),
            Err(e) => return Err(load_error(e.to_string())),
        }

        let owned_path = path.to_path_buf();
        let shape = model.layout_shape();
        tokio::task::spawn_blocking(move || TractSession::from_path(&owned_path, shape))
            .await
            .map_err(|e| load_error(format!("loader task failed: {}", e)))?
            .map_err(|e| load_error(format!("{:#}", e)))
    }
}

/// Optimized, runnable tract plan
pub struct TractSession {
    inputs: Vec<String>,
    outputs: Vec<String>,
    plan: RunFn,
}

impl TractSession {
    /// Build a plan with the input pinned to `input_shape`
    pub fn from_path(path: &Path, input_shape: [usize; 4]) -> TractResult<Self> {
        info!("Building tract plan for {} with input {:?}", path.display(), input_shape);

        let model = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact(input_shape).into())?
            .into_optimized()?;

        let node_names = |outlets: &[OutletId]| -> Vec<String> {
            outlets
                .iter()
                .map(|outlet| model.node(outlet.node).name.clone())
                .collect()
        };
        let inputs = node_names(model.input_outlets()?);
        let outputs = node_names(model.output_outlets()?);
        debug!("Plan inputs {:?}, outputs {:?}", inputs, outputs);

        let plan = model.into_runnable()?;
        Ok(Self {
            inputs,
            outputs,
            plan: Box::new(move |values| plan.run(values)),
        })
    }
}

impl fmt::Debug for TractSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TractSession")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl ModelSession for TractSession {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    fn run(&self, input_name: &str, input: &PreparedTensor) -> Result<Vec<OutputTensor>, InferenceError> {
        let runtime = |e: TractError| InferenceError::Runtime(format!("{:#}", e));

        debug!("Running tract plan, {} <- {:?}", input_name, input.shape);
        let tensor = Tensor::from_shape(&input.shape, &input.data).map_err(runtime)?;
        let results = (self.plan)(tvec!(tensor.into())).map_err(runtime)?;

        results
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let view = value.to_array_view::<f32>().map_err(runtime)?;
                let name = self
                    .outputs
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("output_{}", i));
                Ok(OutputTensor::new(
                    name,
                    view.shape().to_vec(),
                    view.iter().copied().collect(),
                ))
            })
            .collect()
    }
}
