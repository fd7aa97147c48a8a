//! Error taxonomy for model loading, image loading and mask queries.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SegmentError>;

#[derive(Error, Debug)]
pub enum SegmentError {
    /// A model file could not be found or read at construction time.
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// The file exists but the runtime refused to build a session from it.
    #[error("Failed to load model {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// A graph input/output count, rank or shape deviates from the expected contract.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The caller supplied an image of the wrong size or channel count.
    #[error("Input mismatch: {0}")]
    InputMismatch(String),

    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The session's models failed to load at construction.
    #[error("Segmentation models are not loaded")]
    NotLoaded,

    /// A mask was requested before any image was successfully loaded.
    #[error("No image embedding available, call load_image first")]
    NotReady,
}

impl From<ort::Error> for SegmentError {
    fn from(e: ort::Error) -> Self {
        SegmentError::InferenceFailure(e.to_string())
    }
}
