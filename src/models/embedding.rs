//! Cache for the embedding of the most recently loaded image.

use ndarray::{Array4, Ix4};
use tracing::debug;

use crate::error::{Result, SegmentError};
use crate::models::codec::ImageTensor;
use crate::models::engine::{InferenceEngine, ModelHandle, ENCODER_INPUT, IMAGE_EMBEDDINGS};

/// Encoder output `[1, C, H', W']`
pub type Embedding = Array4<f32>;

#[derive(Debug, Default)]
pub enum CacheState {
    #[default]
    Empty,
    Ready(Embedding),
}

/// Single embedding slot, replaced only by a successful refresh
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    state: CacheState,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CacheState::Ready(_))
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        match &self.state {
            CacheState::Ready(embedding) => Some(embedding),
            CacheState::Empty => None,
        }
    }

    pub fn clear(&mut self) {
        self.state = CacheState::Empty;
    }

    /// Run the encoder on `image` and store the result.
    ///
    /// The output must match the encoder's declared output shape. On any
    /// error the previously cached embedding is kept.
    pub fn refresh<E: InferenceEngine>(
        &mut self,
        image: &ImageTensor,
        encoder: &mut ModelHandle<E>,
    ) -> Result<&Embedding> {
        let mut outputs = encoder.run(&[(ENCODER_INPUT, image.view().into_dyn())], &[IMAGE_EMBEDDINGS])?;

        let raw = outputs.remove(IMAGE_EMBEDDINGS).ok_or_else(|| {
            SegmentError::ShapeMismatch(format!("encoder returned no '{}' output", IMAGE_EMBEDDINGS))
        })?;

        let declared = encoder
            .outputs()
            .first()
            .ok_or_else(|| SegmentError::ShapeMismatch("encoder declares no outputs".to_string()))?;
        if !declared.accepts(raw.shape()) {
            return Err(SegmentError::ShapeMismatch(format!(
                "encoder output shape {:?} does not match declared {:?}",
                raw.shape(),
                declared.shape
            )));
        }

        let embedding = raw
            .into_dimensionality::<Ix4>()
            .map_err(|e| SegmentError::ShapeMismatch(e.to_string()))?;
        let embedding = if embedding.is_standard_layout() {
            embedding
        } else {
            embedding.as_standard_layout().into_owned()
        };

        debug!("Cached image embedding of shape {:?}", embedding.shape());
        self.state = CacheState::Ready(embedding);
        self.embedding().ok_or(SegmentError::NotReady)
    }
}
