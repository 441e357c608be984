//! Session backend traits

use std::future::Future;
use std::path::Path;

use image_preprocess::PreparedTensor;
use model_registry::ModelConfig;
use output_decoder::OutputTensor;

use crate::InferenceError;

/// A loaded, ready-to-run model bound to one file.
///
/// Sessions are immutable once created and shared behind `Arc`.
pub trait ModelSession: Send + Sync + 'static {
    /// Declared input names, in model order
    fn input_names(&self) -> &[String];

    /// Declared output names, in model order
    fn output_names(&self) -> &[String];

    /// Run the model with `input` bound to `input_name`.
    /// Outputs are returned in declared order.
    fn run(&self, input_name: &str, input: &PreparedTensor) -> Result<Vec<OutputTensor>, InferenceError>;
}

/// Creates sessions from model files
pub trait SessionLoader: Send + Sync + 'static {
    type Session: ModelSession;

    /// Load the model stored at `path`, described by `model`
    fn load(
        &self,
        path: &Path,
        model: &ModelConfig,
    ) -> impl Future<Output = Result<Self::Session, InferenceError>> + Send;
}
