//! Shared type definitions for prompts and mask results.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pixel coordinate in the loaded image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in format (x1, y1, x2, y2), top-left and bottom-right corners
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box from a top-left corner and a size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    /// A box without positive area carries no prompt
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

fn parse_ints<const N: usize>(s: &str, what: &str) -> Result<[i32; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("Invalid {}: {}. Expected {} comma-separated integers", what, s, N));
    }
    let mut out = [0i32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("Invalid {}: {}. '{}' is not an integer", what, s, part))?;
    }
    Ok(out)
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_ints::<2>(s, "point")?;
        Ok(Point::new(x, y))
    }
}

impl FromStr for BBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x1, y1, x2, y2] = parse_ints::<4>(s, "box")?;
        Ok(BBox::new(x1, y1, x2, y2))
    }
}

/// Prompts for one mask query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    pub points: Vec<Point>,
    pub negative_points: Vec<Point>,
    pub bbox: Option<BBox>,
}

impl PromptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single positive point prompt
    pub fn from_point(point: Point) -> Self {
        Self::new().with_point(point)
    }

    pub fn with_point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }

    pub fn with_negative_point(mut self, point: Point) -> Self {
        self.negative_points.push(point);
        self
    }

    pub fn with_box(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Box that takes part in encoding, empty boxes are dropped
    pub fn effective_box(&self) -> Option<BBox> {
        self.bbox.filter(|b| !b.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.negative_points.is_empty() && self.effective_box().is_none()
    }
}

/// Binary mask and the decoder's confidence for it
#[derive(Debug, Clone)]
pub struct MaskResult {
    /// 0 or 255 per pixel, at the session input resolution
    pub mask: GrayImage,
    /// IoU estimate reported by the decoder
    pub score: f32,
}

impl MaskResult {
    pub fn new(mask: GrayImage, score: f32) -> Self {
        Self { mask, score }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Get mask value at (x, y)
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width() || y >= self.height() {
            return false;
        }
        self.mask.get_pixel(x, y)[0] > 0
    }

    /// Get number of foreground pixels
    pub fn pixel_count(&self) -> usize {
        self.mask.as_raw().iter().filter(|&&v| v > 0).count()
    }

    /// Get tight bounding box of the foreground
    pub fn bbox(&self) -> Option<BBox> {
        let mut min_x = self.width();
        let mut max_x = 0;
        let mut min_y = self.height();
        let mut max_y = 0;
        let mut found = false;

        for (x, y, pixel) in self.mask.enumerate_pixels() {
            if pixel[0] > 0 {
                found = true;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        if found {
            Some(BBox::new(
                min_x as i32,
                min_y as i32,
                (max_x + 1) as i32,
                (max_y + 1) as i32,
            ))
        } else {
            None
        }
    }

    pub fn summary(&self) -> MaskSummary {
        MaskSummary {
            width: self.width(),
            height: self.height(),
            score: self.score,
            pixel_count: self.pixel_count(),
            bbox: self.bbox(),
        }
    }
}

/// Serializable report of a mask result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaskSummary {
    pub width: u32,
    pub height: u32,
    pub score: f32,
    pub pixel_count: usize,
    pub bbox: Option<BBox>,
}
