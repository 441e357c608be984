//! In-process mock backend for development and tests
//!
//! `EchoLoader` produces sessions that return their input unchanged, so the
//! whole pipeline can run without model files.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image_preprocess::PreparedTensor;
use model_registry::ModelConfig;
use output_decoder::OutputTensor;
use tracing::debug;

use crate::session::{ModelSession, SessionLoader};
use crate::InferenceError;

/// What a mock session does when run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoBehavior {
    /// Return the input tensor as the only output
    #[default]
    Echo,
    /// Succeed with zero outputs
    NoOutputs,
    /// Fail every run
    Fail,
}

/// Loader for [`EchoSession`]s that counts how often it loads
#[derive(Debug, Default)]
pub struct EchoLoader {
    loads: AtomicUsize,
    delay: Duration,
    fail_loads: bool,
    behavior: EchoBehavior,
}

impl EchoLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader whose loads always fail
    pub fn failing() -> Self {
        Self {
            fail_loads: true,
            ..Self::default()
        }
    }

    /// Simulated load latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_behavior(mut self, behavior: EchoBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Number of load attempts so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SessionLoader for EchoLoader {
    type Session = EchoSession;

    async fn load(&self, path: &Path, model: &ModelConfig) -> Result<EchoSession, InferenceError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Mock load #{} of {} for {}", attempt, path.display(), model.id);

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_loads {
            return Err(InferenceError::ModelLoad {
                path: path.display().to_string(),
                reason: "mock loader configured to fail".to_string(),
            });
        }

        Ok(EchoSession {
            inputs: vec!["input".to_string()],
            outputs: vec!["output".to_string()],
            behavior: self.behavior,
        })
    }
}

/// Identity model
#[derive(Debug)]
pub struct EchoSession {
    inputs: Vec<String>,
    outputs: Vec<String>,
    behavior: EchoBehavior,
}

impl ModelSession for EchoSession {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    fn run(&self, input_name: &str, input: &PreparedTensor) -> Result<Vec<OutputTensor>, InferenceError> {
        debug!("Mock run on {} with shape {:?}", input_name, input.shape);
        match self.behavior {
            EchoBehavior::Echo => Ok(vec![OutputTensor::new(
                self.outputs[0].clone(),
                input.shape.to_vec(),
                input.data.clone(),
            )]),
            EchoBehavior::NoOutputs => Ok(Vec::new()),
            EchoBehavior::Fail => Err(InferenceError::Runtime(
                "mock session configured to fail".to_string(),
            )),
        }
    }
}
