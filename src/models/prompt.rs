//! Point and box prompts to decoder tensors.
//!
//! Labels and their order are a fixed contract of the decoder graph:
//! positives (1), then negatives (0), then the box corners (2, 3).

use ndarray::{Array2, Array3};

use crate::types::{BBox, Point, PromptSet};

pub const LABEL_NEGATIVE: f32 = 0.0;
pub const LABEL_POSITIVE: f32 = 1.0;
pub const LABEL_BOX_TOP_LEFT: f32 = 2.0;
pub const LABEL_BOX_BOTTOM_RIGHT: f32 = 3.0;

/// Decoder prompt inputs
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTensors {
    /// `[1, N, 2]` pixel coordinates
    pub coords: Array3<f32>,
    /// `[1, N]` category labels
    pub labels: Array2<f32>,
}

impl PromptTensors {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Flatten prompts into coordinate and label tensors.
///
/// Coordinates are passed through unscaled. Empty inputs give `[1, 0, 2]`
/// and `[1, 0]` tensors.
pub fn encode_prompts(points: &[Point], negative_points: &[Point], bbox: Option<BBox>) -> PromptTensors {
    let corners = bbox
        .into_iter()
        .flat_map(|b| [(b.top_left(), LABEL_BOX_TOP_LEFT), (b.bottom_right(), LABEL_BOX_BOTTOM_RIGHT)]);

    let entries: Vec<(Point, f32)> = points
        .iter()
        .map(|&p| (p, LABEL_POSITIVE))
        .chain(negative_points.iter().map(|&p| (p, LABEL_NEGATIVE)))
        .chain(corners)
        .collect();

    let count = entries.len();
    let coords = Array3::from_shape_fn((1, count, 2), |(_, i, axis)| {
        let point = entries[i].0;
        if axis == 0 {
            point.x as f32
        } else {
            point.y as f32
        }
    });
    let labels = Array2::from_shape_fn((1, count), |(_, i)| entries[i].1);

    PromptTensors { coords, labels }
}

impl PromptSet {
    /// Encode with the box dropped when it has no area
    pub fn encode(&self) -> PromptTensors {
        encode_prompts(&self.points, &self.negative_points, self.effective_box())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prompts() {
        let tensors = encode_prompts(&[], &[], None);
        assert_eq!(tensors.coords.shape(), &[1, 0, 2]);
        assert_eq!(tensors.labels.shape(), &[1, 0]);
        assert!(tensors.is_empty());
    }

    #[test]
    fn test_category_order_and_labels() {
        let tensors = encode_prompts(
            &[Point::new(10, 11), Point::new(12, 13)],
            &[Point::new(20, 21)],
            Some(BBox::new(1, 2, 300, 400)),
        );
        assert_eq!(tensors.len(), 5);
        assert_eq!(tensors.labels.as_slice().unwrap(), &[1.0, 1.0, 0.0, 2.0, 3.0]);
        assert_eq!(
            tensors.coords.as_slice().unwrap(),
            &[10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 1.0, 2.0, 300.0, 400.0]
        );
    }

    #[test]
    fn test_intra_category_order_is_preserved() {
        let forward = encode_prompts(&[Point::new(1, 1), Point::new(2, 2)], &[], None);
        let reversed = encode_prompts(&[Point::new(2, 2), Point::new(1, 1)], &[], None);
        assert_eq!(forward.labels, reversed.labels);
        assert_ne!(forward.coords, reversed.coords);
        assert_eq!(forward.coords[[0, 0, 0]], 1.0);
        assert_eq!(reversed.coords[[0, 0, 0]], 2.0);
    }

    #[test]
    fn test_box_only() {
        let tensors = encode_prompts(&[], &[], Some(BBox::new(0, 0, 1024, 1024)));
        assert_eq!(tensors.coords.shape(), &[1, 2, 2]);
        assert_eq!(tensors.labels.as_slice().unwrap(), &[2.0, 3.0]);
        assert_eq!(tensors.coords.as_slice().unwrap(), &[0.0, 0.0, 1024.0, 1024.0]);
    }

    #[test]
    fn test_negative_only() {
        let tensors = encode_prompts(&[], &[Point::new(5, 5), Point::new(1019, 5)], None);
        assert_eq!(tensors.labels.as_slice().unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_coordinates_not_scaled() {
        let tensors = encode_prompts(&[Point::new(-3, 5000)], &[], None);
        assert_eq!(tensors.coords.as_slice().unwrap(), &[-3.0, 5000.0]);
    }

    #[test]
    fn test_prompt_set_encode_skips_empty_box() {
        let prompts = PromptSet::from_point(Point::new(512, 512)).with_box(BBox::new(10, 10, 10, 50));
        let tensors = prompts.encode();
        assert_eq!(tensors.labels.as_slice().unwrap(), &[1.0]);
    }
}
