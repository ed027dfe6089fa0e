//! EditSession: base frame + active filter + sticker history → render buffer.
//!
//! The render buffer is always `replay(filter(original), history)`. Every
//! mutation either rebuilds it from that formula or, for `place`, stamps the
//! one new sticker on top, which gives the same bytes.
//!
//! Each mutation bumps `revision`. Background recomputes (see
//! [`crate::worker`]) carry the revision they were cut at and are thrown away
//! on commit if anything happened in between.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::compositor;
use crate::error::{Error, Result};
use crate::filters::{self, Filter};
use crate::io;
use crate::sprites::SpriteStore;
use crate::types::{Frame, Placement, SpriteId};

pub struct EditSession {
    sprites: Arc<SpriteStore>,
    original: Option<Frame>,
    /// `original` after `filter`; cached so rollback only has to replay.
    filtered: Option<Frame>,
    render: Option<Frame>,
    filter: Filter,
    history: Vec<Placement>,
    revision: u64,
}

impl EditSession {
    pub fn new(sprites: Arc<SpriteStore>) -> Self {
        Self {
            sprites,
            original: None,
            filtered: None,
            render: None,
            filter: Filter::Identity,
            history: Vec::new(),
            revision: 0,
        }
    }

    /* ------------------------------ queries ------------------------------ */

    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    /// What the renderer should show; `None` until a base image exists.
    pub fn render_buffer(&self) -> Option<&Frame> {
        self.render.as_ref()
    }

    pub fn original_image(&self) -> Option<&Frame> {
        self.original.as_ref()
    }

    pub fn active_filter(&self) -> Filter {
        self.filter
    }

    pub fn history(&self) -> &[Placement] {
        &self.history
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn sprites(&self) -> &Arc<SpriteStore> {
        &self.sprites
    }

    /* ----------------------------- mutations ----------------------------- */

    /// New base image from a file or snapshot: history is cleared, the filter kept.
    pub fn load_image(&mut self, frame: Frame) {
        self.bump();
        info!(w = frame.width(), h = frame.height(), dropped = self.history.len(), "image loaded");
        self.history.clear();
        self.original = Some(frame);
        self.recompute();
    }

    /// Open `path` and load it. On failure the current image and history stay as they were.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let frame = io::open_file(path)?;
        self.load_image(frame);
        Ok(())
    }

    /// New live frame: history is kept so stickers follow the stream.
    pub fn ingest_frame(&mut self, frame: Frame) {
        self.bump();
        self.original = Some(frame);
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.bump();
        debug!(filter = filter.name(), "filter selected");
        self.filter = filter;
        self.recompute();
    }

    /// Select by name; unknown names select identity.
    pub fn set_filter_named(&mut self, name: &str) {
        self.set_filter(Filter::resolve(name));
    }

    /// Centre `sprite` on the native pixel `(x, y)`.
    pub fn place(&mut self, x: i64, y: i64, sprite: SpriteId) -> Result<Placement> {
        let Some(render) = self.render.as_mut() else {
            return Err(Error::EmptySession);
        };
        let Some(img) = self.sprites.get(sprite) else {
            return Err(Error::UnknownSprite(sprite));
        };

        let placement = Placement {
            origin_x: x.saturating_sub(img.width() as i64 / 2),
            origin_y: y.saturating_sub(img.height() as i64 / 2),
            sprite,
        };
        compositor::blend(render, img, placement.origin_x, placement.origin_y);
        self.history.push(placement);
        self.bump();
        debug!(?placement, count = self.history.len(), "sticker placed");
        Ok(placement)
    }

    /// Drop the newest placement and replay the rest. `Ok(None)` when there is nothing to undo.
    pub fn rollback(&mut self) -> Result<Option<Placement>> {
        let Some(filtered) = self.filtered.as_ref() else {
            return Err(Error::EmptySession);
        };
        let Some(removed) = self.history.pop() else {
            return Ok(None);
        };
        self.render = Some(compositor::replay(filtered, &self.history, &self.sprites));
        self.bump();
        debug!(?removed, count = self.history.len(), "sticker rolled back");
        Ok(Some(removed))
    }

    /* --------------------------- deferred work --------------------------- */

    /// Cut a recompute for a live frame without touching the current render.
    /// The result only lands if [`EditSession::commit`] sees no newer mutation.
    pub fn prepare_frame(&mut self, frame: Frame) -> RecomputeJob {
        self.bump();
        RecomputeJob {
            revision: self.revision,
            frame,
            filter: self.filter,
            history: self.history.clone(),
            sprites: Arc::clone(&self.sprites),
        }
    }

    /// Install a finished recompute. Returns false (and drops it) when stale.
    pub fn commit(&mut self, done: Recomputed) -> bool {
        if done.revision != self.revision {
            debug!(job = done.revision, current = self.revision, "stale recompute discarded");
            return false;
        }
        self.original = Some(done.original);
        self.filtered = Some(done.filtered);
        self.render = Some(done.render);
        true
    }

    /* ------------------------------ helpers ------------------------------ */

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn recompute(&mut self) {
        let Some(original) = self.original.as_ref() else {
            return;
        };
        let filtered = filters::apply(original, self.filter);
        let render = compositor::replay(&filtered, &self.history, &self.sprites);
        self.filtered = Some(filtered);
        self.render = Some(render);
    }
}

/// Everything a worker needs to rebuild the render buffer for one live frame.
pub struct RecomputeJob {
    revision: u64,
    frame: Frame,
    filter: Filter,
    history: Vec<Placement>,
    sprites: Arc<SpriteStore>,
}

/// Output of [`RecomputeJob::run`], handed back to [`EditSession::commit`].
pub struct Recomputed {
    revision: u64,
    original: Frame,
    filtered: Frame,
    render: Frame,
}

impl RecomputeJob {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn run(self) -> Recomputed {
        let filtered = filters::apply(&self.frame, self.filter);
        let render = compositor::replay(&filtered, &self.history, &self.sprites);
        Recomputed {
            revision: self.revision,
            original: self.frame,
            filtered,
            render,
        }
    }
}

impl Recomputed {
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
