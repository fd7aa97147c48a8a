//! Command-line interface for the edge-segment binary.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ProviderConfig, SessionConfig};
use crate::types::{BBox, Point, PromptSet};

/// edge-segment - Promptable segmentation with EdgeSAM on ONNX Runtime
#[derive(Parser, Debug)]
#[command(
    name = "edge-segment",
    about = "Segment an image from point and box prompts with an EdgeSAM encoder/decoder pair",
    version,
    author
)]
pub struct Cli {
    /// Image file to segment
    #[arg(required = true, value_name = "IMAGE_PATH")]
    pub image: PathBuf,

    /// Encoder ONNX model path
    #[arg(
        short,
        long,
        default_value = "models/edge_sam_3x_encoder.onnx",
        value_name = "PATH"
    )]
    pub encoder: PathBuf,

    /// Decoder ONNX model path
    #[arg(
        short,
        long,
        default_value = "models/edge_sam_3x_decoder.onnx",
        value_name = "PATH"
    )]
    pub decoder: PathBuf,

    /// JSON session configuration, replaces the model, thread and device flags
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Runtime intra-op threads (defaults to available parallelism)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Run both graphs on CUDA
    #[arg(long)]
    pub gpu: bool,

    /// CUDA device index used with --gpu
    #[arg(long, default_value = "0", value_name = "ID")]
    pub device_id: i32,

    /// Positive prompt point "x,y" (repeatable)
    #[arg(short, long = "point", value_name = "X,Y")]
    pub points: Vec<Point>,

    /// Negative prompt point "x,y" (repeatable)
    #[arg(short, long = "negative", value_name = "X,Y")]
    pub negative_points: Vec<Point>,

    /// Box prompt "x1,y1,x2,y2" in model input coordinates
    #[arg(short, long = "box", value_name = "X1,Y1,X2,Y2")]
    pub bbox: Option<BBox>,

    /// Output mask path (default: <IMAGE>_mask.png)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write a preview with the background dimmed
    #[arg(long, value_name = "PATH")]
    pub overlay: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Verbose logging (can be repeated: -v, -vv, -vvv)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Session configuration built from flags
    pub fn session_config(&self) -> SessionConfig {
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let provider = if self.gpu {
            ProviderConfig::cuda(self.device_id)
        } else {
            ProviderConfig::cpu()
        };

        SessionConfig::new(&self.encoder, &self.decoder)
            .with_threads(threads)
            .with_providers(provider, provider)
    }

    /// Prompts from flags, a box over the whole input when none are given
    pub fn prompts(&self, input_size: (u32, u32)) -> PromptSet {
        let prompts = PromptSet {
            points: self.points.clone(),
            negative_points: self.negative_points.clone(),
            bbox: self.bbox,
        };
        if prompts.is_empty() {
            PromptSet::new().with_box(BBox::new(0, 0, input_size.0 as i32, input_size.1 as i32))
        } else {
            prompts
        }
    }

    pub fn mask_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self
                .image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            self.image.with_file_name(format!("{}_mask.png", stem))
        })
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            _ => Err(format!("Unknown format: {}. Use 'json' or 'text'", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

/// Get tracing level from verbosity
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
