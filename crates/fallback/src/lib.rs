//! Fallback Style Simulator
//!
//! Produces a deterministic stand-in image from the preprocessed tensor
//! when model inference is unavailable. Uses only per-pixel and
//! per-position arithmetic; no model is involved and rendering never fails.

mod effects;
mod simulator;

pub use effects::FallbackEffect;
pub use simulator::FallbackSimulator;
