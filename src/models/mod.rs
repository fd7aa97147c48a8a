//! Model-facing pieces: graph execution, tensor codec, prompt encoding and the embedding cache.

pub mod codec;
pub mod embedding;
pub mod engine;
pub mod preprocessing;
pub mod prompt;

pub use codec::{decode_mask, encode_image, ImageTensor};
pub use embedding::{CacheState, Embedding, EmbeddingCache};
pub use engine::{InferenceEngine, ModelHandle, OrtEngine, TensorSpec};
pub use preprocessing::{overlay_mask, prepare_image};
pub use prompt::{encode_prompts, PromptTensors};
