//! ONNX Runtime environment management
//!
//! The runtime exposes one process-wide environment that all model sessions
//! borrow. It is created explicitly on the first model load and lives until
//! process end; nothing else in the crate touches global state.

use crate::error::EngineError;
use std::sync::OnceLock;

static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialise the shared ONNX Runtime environment once
///
/// Safe to call repeatedly; only the first call does work. Model
/// constructors call this before building their sessions.
///
/// # Errors
///
/// Returns `EngineError::ModelLoad` if the runtime cannot be initialised
/// (for example when the ONNX Runtime library cannot be found).
pub fn ensure_initialized() -> Result<(), EngineError> {
    let result = INIT_RESULT.get_or_init(|| {
        ort::init()
            .with_name("pulsekey")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    });

    result.clone().map_err(EngineError::ModelLoad)
}
