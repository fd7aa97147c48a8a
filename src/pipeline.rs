//! Segmentation session orchestrating encoder, embedding cache and decoder.

use ndarray::{s, ArrayView3, Ix4};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SegmentError};
use crate::models::codec::{decode_mask, encode_image};
use crate::models::embedding::EmbeddingCache;
use crate::models::engine::{
    is_readable_file, InferenceEngine, ModelHandle, OrtEngine, IMAGE_EMBEDDINGS, MASKS, POINT_COORDS, POINT_LABELS, SCORES,
};
use crate::types::{MaskResult, Point, PromptSet};

/// Validated encoder/decoder pair
struct Models<E> {
    encoder: ModelHandle<E>,
    decoder: ModelHandle<E>,
    /// `(width, height)` from the encoder input `[_, _, H, W]`
    input_size: (u32, u32),
}

impl<E: InferenceEngine> Models<E> {
    fn validate(encoder: E, decoder: E) -> Result<Self> {
        let encoder = ModelHandle::new(encoder);
        let decoder = ModelHandle::new(decoder);

        if encoder.inputs().len() != 1 || encoder.outputs().len() != 1 {
            return Err(SegmentError::ShapeMismatch(format!(
                "encoder must have 1 input and 1 output, found {} and {}",
                encoder.inputs().len(),
                encoder.outputs().len()
            )));
        }
        if decoder.inputs().len() != 3 {
            return Err(SegmentError::ShapeMismatch(format!(
                "decoder must have 3 inputs, found {}",
                decoder.inputs().len()
            )));
        }

        let input = &encoder.inputs()[0];
        let output = &encoder.outputs()[0];
        if input.rank() != 4 || output.rank() != 4 {
            return Err(SegmentError::ShapeMismatch(format!(
                "encoder input and output must be rank 4, found {:?} and {:?}",
                input.shape, output.shape
            )));
        }

        let (height, width) = (input.shape[2], input.shape[3]);
        if height <= 0 || width <= 0 {
            return Err(SegmentError::ShapeMismatch(format!(
                "encoder input must have a static spatial size, found {:?}",
                input.shape
            )));
        }

        debug!(
            "Encoder {:?} -> {:?}, decoder inputs {:?}",
            input.shape,
            output.shape,
            decoder.inputs().iter().map(|spec| spec.name.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            encoder,
            decoder,
            input_size: (width as u32, height as u32),
        })
    }
}

/// Promptable segmentation over one image at a time.
///
/// A session that failed to load its models stays usable as a value but
/// every call fails; check [`SegmentationSession::is_loaded`] before use.
pub struct SegmentationSession<E = OrtEngine> {
    models: Option<Models<E>>,
    load_error: Option<SegmentError>,
    cache: EmbeddingCache,
}

impl SegmentationSession<OrtEngine> {
    /// Load the encoder and decoder graphs described by `config`
    ///
    /// Never fails: model problems leave the session not loaded, with the
    /// reason available from [`SegmentationSession::load_error`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SessionConfig::new(
    ///     "models/edge_sam_3x_encoder.onnx",
    ///     "models/edge_sam_3x_decoder.onnx",
    /// );
    /// let mut session = SegmentationSession::new(&config);
    /// if !session.is_loaded() {
    ///     return;
    /// }
    /// session.load_image(image.view())?;
    /// let result = session.get_mask(&PromptSet::from_point(Point::new(512, 512)))?;
    /// ```
    pub fn new(config: &SessionConfig) -> Self {
        Self::from_models(load_models(config))
    }

    /// Like [`SegmentationSession::new`] but returns the load error directly
    pub fn open(config: &SessionConfig) -> Result<Self> {
        load_models(config).map(Self::with_models)
    }
}

fn load_models(config: &SessionConfig) -> Result<Models<OrtEngine>> {
    for path in [&config.encoder_model_path, &config.decoder_model_path] {
        if !is_readable_file(path) {
            return Err(SegmentError::ModelNotFound(path.clone()));
        }
    }

    let encoder = OrtEngine::load(
        &config.encoder_model_path,
        &config.encoder_provider,
        config.thread_count,
    )?;
    let decoder = OrtEngine::load(
        &config.decoder_model_path,
        &config.decoder_provider,
        config.thread_count,
    )?;

    Models::validate(encoder, decoder)
}

impl<E: InferenceEngine> SegmentationSession<E> {
    /// Build a session over already loaded engines, with the same validation as [`SegmentationSession::new`]
    pub fn from_engines(encoder: E, decoder: E) -> Self {
        Self::from_models(Models::validate(encoder, decoder))
    }

    pub fn try_from_engines(encoder: E, decoder: E) -> Result<Self> {
        Models::validate(encoder, decoder).map(Self::with_models)
    }

    fn with_models(models: Models<E>) -> Self {
        info!(
            "Segmentation session ready, input size {}x{}",
            models.input_size.0, models.input_size.1
        );
        Self {
            models: Some(models),
            load_error: None,
            cache: EmbeddingCache::new(),
        }
    }

    fn from_models(models: Result<Models<E>>) -> Self {
        match models {
            Ok(models) => Self::with_models(models),
            Err(e) => {
                warn!("Segmentation session not loaded: {}", e);
                Self {
                    models: None,
                    load_error: Some(e),
                    cache: EmbeddingCache::new(),
                }
            }
        }
    }

    /// Readiness flag for the model pair
    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }

    /// Why the models failed to load, if they did
    pub fn load_error(&self) -> Option<&SegmentError> {
        self.load_error.as_ref()
    }

    /// Whether an image embedding is cached and masks can be requested
    pub fn has_image(&self) -> bool {
        self.cache.is_ready()
    }

    /// Encoder input `(width, height)`, `(0, 0)` when not loaded
    pub fn get_input_size(&self) -> (u32, u32) {
        self.models.as_ref().map_or((0, 0), |models| models.input_size)
    }

    /// Encode an image and cache its embedding
    ///
    /// # Arguments
    ///
    /// * `image` - Interleaved BGR raster `[height, width, 3]` of exactly [`SegmentationSession::get_input_size`]
    ///
    /// On failure the previously cached embedding, if any, stays in place.
    pub fn load_image(&mut self, image: ArrayView3<'_, u8>) -> Result<()> {
        let models = self.models.as_mut().ok_or(SegmentError::NotLoaded)?;

        let tensor = encode_image(image, models.input_size)?;
        self.cache.refresh(&tensor, &mut models.encoder)?;

        info!("Image embedding computed");
        Ok(())
    }

    /// Run the decoder on the cached embedding
    ///
    /// Returns [`SegmentError::NotReady`] when no image has been loaded.
    pub fn get_mask(&mut self, prompts: &PromptSet) -> Result<MaskResult> {
        let models = self.models.as_mut().ok_or(SegmentError::NotReady)?;
        let embedding = self.cache.embedding().ok_or(SegmentError::NotReady)?;

        let prompt = prompts.encode();
        debug!("Decoding mask with {} prompt points", prompt.len());

        let mut outputs = models.decoder.run(
            &[
                (IMAGE_EMBEDDINGS, embedding.view().into_dyn()),
                (POINT_COORDS, prompt.coords.view().into_dyn()),
                (POINT_LABELS, prompt.labels.view().into_dyn()),
            ],
            &[SCORES, MASKS],
        )?;

        let scores = outputs
            .remove(SCORES)
            .ok_or_else(|| SegmentError::ShapeMismatch(format!("decoder returned no '{}' output", SCORES)))?;
        let score = scores
            .iter()
            .next()
            .copied()
            .ok_or_else(|| SegmentError::ShapeMismatch("decoder returned an empty score tensor".to_string()))?;

        let masks = outputs
            .remove(MASKS)
            .ok_or_else(|| SegmentError::ShapeMismatch(format!("decoder returned no '{}' output", MASKS)))?
            .into_dimensionality::<Ix4>()
            .map_err(|e| SegmentError::ShapeMismatch(format!("decoder masks must be rank 4: {}", e)))?;
        if masks.shape()[0] == 0 || masks.shape()[1] == 0 {
            return Err(SegmentError::ShapeMismatch(format!(
                "decoder returned no mask planes, shape {:?}",
                masks.shape()
            )));
        }

        let mask = decode_mask(masks.slice(s![0, 0, .., ..]), models.input_size);
        debug!("Mask decoded with score {:.4}", score);

        Ok(MaskResult::new(mask, score))
    }

    /// Mask for a single positive point
    pub fn get_mask_at(&mut self, point: Point) -> Result<MaskResult> {
        self.get_mask(&PromptSet::from_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_session_not_loaded_with_missing_models() {
        let config = SessionConfig::new("nonexistent_encoder.onnx", "nonexistent_decoder.onnx");
        let session = SegmentationSession::new(&config);
        assert!(!session.is_loaded());
        assert_eq!(session.get_input_size(), (0, 0));
        assert!(matches!(
            session.load_error(),
            Some(SegmentError::ModelNotFound(path)) if path == &PathBuf::from("nonexistent_encoder.onnx")
        ));
    }

    #[test]
    fn test_missing_decoder_checked_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = dir.path().join("encoder.onnx");
        std::fs::write(&encoder, b"not a real graph").unwrap();

        let config = SessionConfig::new(&encoder, dir.path().join("decoder.onnx"));
        let result = SegmentationSession::open(&config);
        assert!(matches!(result, Err(SegmentError::ModelNotFound(path)) if path.ends_with("decoder.onnx")));
    }

    #[test]
    fn test_not_loaded_session_rejects_calls() {
        let config = SessionConfig::new("nonexistent_encoder.onnx", "nonexistent_decoder.onnx");
        let mut session = SegmentationSession::new(&config);
        let image = ndarray::Array3::<u8>::zeros((4, 4, 3));
        assert!(matches!(
            session.load_image(image.view()),
            Err(SegmentError::NotLoaded)
        ));
        assert!(matches!(
            session.get_mask(&PromptSet::new()),
            Err(SegmentError::NotReady)
        ));
    }
}
