// Core types shared by the compositing pipeline and the window glue.

use image::{RgbImage, RgbaImage};

/// Working image: 3 channels, RGB order, row-major, 8 bits each.
pub type Frame = RgbImage;

/// Overlay sprite: RGBA, alpha used as a binary mask.
pub type Sprite = RgbaImage;

/// Stable sprite identifier (position of the file in the sorted sticker directory).
pub type SpriteId = usize;

/// One sticker placement: top-left native-pixel anchor plus which sprite.
/// Origins may be negative or past the image edge; clipping happens while blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub origin_x: i64,
    pub origin_y: i64,
    pub sprite: SpriteId,
}

/// Packed pixels the window consumes.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Repack an RGB frame into 0x00RRGGBB, reusing the allocation when the size matches.
    pub fn fill_from(&mut self, frame: &Frame) {
        let (w, h) = frame.dimensions();
        self.width = w as usize;
        self.height = h as usize;
        self.pixels.clear();
        self.pixels.extend(frame.as_raw().chunks_exact(3).map(|p| {
            ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32
        }));
    }
}
