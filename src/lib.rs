//! Live sticker booth core.
//!
//! A base frame (file or webcam) goes through one [`filters::Filter`], then
//! every sticker placement in the session history is stamped on top by the
//! [`compositor`]. Clicks reach the session through [`mapper`], which undoes
//! the window's letterboxing. The window and camera glue lives in the binary.

pub mod compositor;
pub mod config;
pub mod error;
pub mod filters;
pub mod io;
pub mod mapper;
pub mod session;
pub mod sprites;
pub mod types;
pub mod worker;

pub use error::{Error, Result};
pub use filters::Filter;
pub use session::EditSession;
pub use sprites::SpriteStore;
pub use types::{Frame, Placement, Sprite, SpriteId};
