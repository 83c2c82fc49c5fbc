//! Error types for the detection engine

use std::fmt;

/// Errors that can occur while loading models or processing audio
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Invalid input parameters
    InvalidInput(String),

    /// Model file missing, unreadable, or incompatible with the declared shapes
    ModelLoad(String),

    /// The neural back-end rejected an inference request
    Inference(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            EngineError::ModelLoad(msg) => write!(f, "Model load error: {}", msg),
            EngineError::Inference(msg) => write!(f, "Inference error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ort::Error> for EngineError {
    fn from(err: ort::Error) -> Self {
        EngineError::Inference(err.to_string())
    }
}
