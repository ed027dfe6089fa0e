//! Display-surface → native-pixel mapping.
//!
//! The window shows the frame scaled uniformly to fit and centred, so one axis
//! fills the surface (the binding axis) and the other gets equal bars on both
//! sides. Clicks arrive in surface pixels and have to be taken back to frame
//! pixels before a sticker is anchored.

use crate::error::{Error, Result};

/// Uniform fit of an image into a display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Native pixels per surface pixel.
    pub scale: f64,
    /// Bar width on the left (pillarbox), zero when width binds.
    pub offset_x: f64,
    /// Bar height on top (letterbox), zero when height binds.
    pub offset_y: f64,
}

impl Letterbox {
    pub fn new(display_w: usize, display_h: usize, image_w: u32, image_h: u32) -> Result<Self> {
        if display_w == 0 || display_h == 0 || image_w == 0 || image_h == 0 {
            return Err(Error::InvalidSurface { width: display_w, height: display_h });
        }
        let (dw, dh) = (display_w as f64, display_h as f64);
        let (iw, ih) = (image_w as f64, image_h as f64);
        let sx = iw / dw;
        let sy = ih / dh;

        Ok(if sx >= sy {
            // Width binds: bars top and bottom.
            Self { scale: sx, offset_x: 0.0, offset_y: (dh - ih / sx) / 2.0 }
        } else {
            Self { scale: sy, offset_x: (dw - iw / sy) / 2.0, offset_y: 0.0 }
        })
    }

    /// Surface position → native pixel (floored). Clicks on a bar map outside the image.
    pub fn to_native(&self, click_x: f32, click_y: f32) -> (i64, i64) {
        let nx = (click_x as f64 - self.offset_x) * self.scale;
        let ny = (click_y as f64 - self.offset_y) * self.scale;
        (nx.floor() as i64, ny.floor() as i64)
    }
}

/// One-shot form of [`Letterbox::to_native`].
pub fn to_native_pixel(
    click_x: f32,
    click_y: f32,
    display_w: usize,
    display_h: usize,
    image_w: u32,
    image_h: u32,
) -> Result<(i64, i64)> {
    Ok(Letterbox::new(display_w, display_h, image_w, image_h)?.to_native(click_x, click_y))
}
