#![doc = include_str!("../README.md")]

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod types;

pub use config::{DeviceType, ProviderConfig, SessionConfig};
pub use error::{Result, SegmentError};
pub use pipeline::SegmentationSession;
pub use types::{BBox, MaskResult, MaskSummary, Point, PromptSet};
