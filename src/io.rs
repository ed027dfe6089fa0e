// File side of the image source/sink: decode into RGB frames, encode renders back out.

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::Frame;

/// Decode any format `image` understands into an RGB frame.
pub fn open_file(path: &Path) -> Result<Frame> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let frame = img.to_rgb8();
    info!(path = %path.display(), w = frame.width(), h = frame.height(), "image opened");
    Ok(frame)
}

/// Encode `frame`; the format follows the file extension.
pub fn save(frame: &Frame, path: &Path) -> Result<()> {
    frame.save(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!(path = %path.display(), "image saved");
    Ok(())
}
