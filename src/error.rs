// One error type for the core and the window/camera glue.
// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

use crate::types::SpriteId;

#[derive(Debug, Error)]
pub enum Error {
    /// A file or stream could not be decoded into pixels.
    #[error("decode failed for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The image sink refused the buffer.
    #[error("write failed for {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// Display surface has a zero dimension (not realized yet).
    #[error("invalid display surface {width}x{height}")]
    InvalidSurface { width: usize, height: usize },

    /// Placement or rollback requested before any base image exists.
    #[error("no base image loaded")]
    EmptySession,

    #[error("unknown sprite id {0}")]
    UnknownSprite(SpriteId),

    /// Camera had nothing for us this tick; callers retry on the next poll.
    #[error("no frame: {0}")]
    NoFrame(String),

    #[error("camera init error: {0}")]
    CameraInit(String),

    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
