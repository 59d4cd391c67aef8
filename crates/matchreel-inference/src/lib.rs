//! Vision-language inference for highlight detection.
//!
//! The pipeline depends only on [`VisionInference`]; [`GeminiClient`] is the
//! production implementation backed by the Gemini `generateContent` API.

pub mod client;
pub mod error;
pub mod logging;
pub mod types;

pub use client::{GeminiClient, GeminiConfig, VisionInference};
pub use error::{InferenceError, InferenceResult};
