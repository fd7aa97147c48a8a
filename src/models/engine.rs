//! Graph execution behind a capability trait, with an ONNX Runtime implementation.

use ndarray::{ArrayD, ArrayViewD};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{TensorRef, ValueType};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{DeviceType, ProviderConfig};
use crate::error::{Result, SegmentError};

/// Encoder input holding the planar image
pub const ENCODER_INPUT: &str = "image";
/// Encoder output, also the first decoder input
pub const IMAGE_EMBEDDINGS: &str = "image_embeddings";
pub const POINT_COORDS: &str = "point_coords";
pub const POINT_LABELS: &str = "point_labels";
pub const SCORES: &str = "scores";
pub const MASKS: &str = "masks";

/// Declared name and shape of a graph input or output.
///
/// Dynamic dimensions are negative, as ONNX reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<i64>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Whether a concrete shape satisfies this declaration
    pub fn accepts(&self, shape: &[usize]) -> bool {
        self.shape.len() == shape.len()
            && self
                .shape
                .iter()
                .zip(shape)
                .all(|(&declared, &actual)| declared < 0 || declared as usize == actual)
    }
}

/// Runs one computational graph on named f32 tensors.
pub trait InferenceEngine {
    fn inputs(&self) -> Vec<TensorSpec>;

    fn outputs(&self) -> Vec<TensorSpec>;

    /// Execute the graph and return the requested outputs by name
    fn run(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
        outputs: &[&str],
    ) -> Result<HashMap<String, ArrayD<f32>>>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn inputs(&self) -> Vec<TensorSpec> {
        (**self).inputs()
    }

    fn outputs(&self) -> Vec<TensorSpec> {
        (**self).outputs()
    }

    fn run(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
        outputs: &[&str],
    ) -> Result<HashMap<String, ArrayD<f32>>> {
        (**self).run(inputs, outputs)
    }
}

/// A loaded graph together with the tensor specs it declared at load time
pub struct ModelHandle<E> {
    engine: E,
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
}

impl<E: InferenceEngine> ModelHandle<E> {
    pub fn new(engine: E) -> Self {
        let inputs = engine.inputs();
        let outputs = engine.outputs();
        Self {
            engine,
            inputs,
            outputs,
        }
    }

    pub fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    pub fn run(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
        outputs: &[&str],
    ) -> Result<HashMap<String, ArrayD<f32>>> {
        self.engine.run(inputs, outputs)
    }
}

/// ONNX Runtime session implementing [`InferenceEngine`]
pub struct OrtEngine {
    session: Session,
    model_path: PathBuf,
}

impl OrtEngine {
    /// Load an ONNX graph
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the ONNX model file
    /// * `provider` - Device the graph runs on
    /// * `threads` - Intra-op thread pool size
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = OrtEngine::load("models/edge_sam_3x_encoder.onnx", &ProviderConfig::cpu(), 4)?;
    /// ```
    pub fn load(model_path: impl AsRef<Path>, provider: &ProviderConfig, threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        debug!("Loading ONNX model from: {}", model_path.display());

        if !is_readable_file(model_path) {
            return Err(SegmentError::ModelNotFound(model_path.to_path_buf()));
        }

        let load_error = |reason: String| SegmentError::ModelLoad {
            path: model_path.to_path_buf(),
            reason,
        };

        // ort resolves the runtime library lazily and panics when it cannot be loaded
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(threads.max(1))?
                .with_execution_providers([execution_provider(provider)])?
                .commit_from_file(model_path)
        }));

        let session = match built {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(load_error(e.to_string())),
            Err(payload) => return Err(load_error(panic_message(payload.as_ref()))),
        };

        debug!(
            "Model {} loaded on {:?} with {} inputs and {} outputs",
            model_path.display(),
            provider.device,
            session.inputs.len(),
            session.outputs.len()
        );

        Ok(Self {
            session,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// Whether `path` is a regular file this process can open
pub fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "ONNX Runtime initialization panicked".to_string()
    }
}

fn execution_provider(provider: &ProviderConfig) -> ExecutionProviderDispatch {
    match provider.device {
        DeviceType::Cpu => CPUExecutionProvider::default().build(),
        DeviceType::Cuda => {
            let mut cuda = CUDAExecutionProvider::default().with_device_id(provider.device_id);
            if provider.memory_limit > 0 {
                cuda = cuda.with_memory_limit(provider.memory_limit);
            }
            cuda.build().error_on_failure()
        }
    }
}

fn spec_of(name: &str, value_type: &ValueType) -> TensorSpec {
    let shape = value_type
        .tensor_shape()
        .map(|shape| shape.iter().copied().collect())
        .unwrap_or_default();
    TensorSpec::new(name, shape)
}

impl InferenceEngine for OrtEngine {
    fn inputs(&self) -> Vec<TensorSpec> {
        self.session
            .inputs
            .iter()
            .map(|input| spec_of(&input.name, &input.input_type))
            .collect()
    }

    fn outputs(&self) -> Vec<TensorSpec> {
        self.session
            .outputs
            .iter()
            .map(|output| spec_of(&output.name, &output.output_type))
            .collect()
    }

    fn run(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
        outputs: &[&str],
    ) -> Result<HashMap<String, ArrayD<f32>>> {
        let mut session_inputs: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, view) in inputs {
            let tensor = TensorRef::from_array_view(view.view())?;
            session_inputs.push((name.to_string(), tensor.into()));
        }

        let session_outputs = self.session.run(session_inputs)?;

        let mut extracted = HashMap::with_capacity(outputs.len());
        for &name in outputs {
            let value = session_outputs.get(name).ok_or_else(|| {
                SegmentError::ShapeMismatch(format!("graph produced no output named '{}'", name))
            })?;
            let array = value.try_extract_array::<f32>()?.to_owned();
            debug!("Output '{}' has shape {:?}", name, array.shape());
            extracted.insert(name.to_string(), array);
        }

        Ok(extracted)
    }
}
