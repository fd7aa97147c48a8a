//! Construction-time configuration for a segmentation session.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SegmentError};

/// Device a graph runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Cpu,
    Cuda,
}

/// Execution provider settings for one graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub device: DeviceType,
    pub device_id: i32,
    /// GPU arena limit in bytes, 0 leaves the runtime default
    pub memory_limit: usize,
}

impl ProviderConfig {
    pub fn cpu() -> Self {
        Self::default()
    }

    pub fn cuda(device_id: i32) -> Self {
        Self {
            device: DeviceType::Cuda,
            device_id,
            memory_limit: 0,
        }
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }
}

/// Model paths, runtime threads and per-graph devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub encoder_model_path: PathBuf,
    pub decoder_model_path: PathBuf,
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
    #[serde(default)]
    pub encoder_provider: ProviderConfig,
    #[serde(default)]
    pub decoder_provider: ProviderConfig,
}

fn default_thread_count() -> usize {
    1
}

impl SessionConfig {
    /// Create a CPU configuration for an encoder/decoder pair
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SessionConfig::new(
    ///     "models/edge_sam_3x_encoder.onnx",
    ///     "models/edge_sam_3x_decoder.onnx",
    /// )
    /// .with_threads(4);
    /// ```
    pub fn new(encoder_model_path: impl Into<PathBuf>, decoder_model_path: impl Into<PathBuf>) -> Self {
        Self {
            encoder_model_path: encoder_model_path.into(),
            decoder_model_path: decoder_model_path.into(),
            thread_count: default_thread_count(),
            encoder_provider: ProviderConfig::cpu(),
            decoder_provider: ProviderConfig::cpu(),
        }
    }

    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_providers(mut self, encoder: ProviderConfig, decoder: ProviderConfig) -> Self {
        self.encoder_provider = encoder;
        self.decoder_provider = decoder;
        self
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SegmentError::Config(format!("cannot read config {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SegmentError::Config(e.to_string()))
    }
}
