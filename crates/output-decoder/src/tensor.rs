//! Raw output tensor

use serde::{Deserialize, Serialize};

/// One named output produced by an inference session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTensor {
    /// Output name as declared by the model
    pub name: String,
    /// Dimension sizes
    pub shape: Vec<usize>,
    /// Flat samples in row-major order
    pub data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape,
            data,
        }
    }

    /// Number of samples the shape declares
    pub fn declared_len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Smallest and largest sample, ignoring NaN
    pub fn range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
