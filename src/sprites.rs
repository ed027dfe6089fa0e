// SpriteStore: every sticker PNG, decoded once at startup and read-only afterwards.
// Ids are positions in the name-sorted file list, so a broken file leaves a gap
// instead of renumbering the stickers behind it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{Sprite, SpriteId};

#[derive(Debug, Default, Clone)]
pub struct SpriteStore {
    sprites: BTreeMap<SpriteId, Arc<Sprite>>,
}

impl SpriteStore {
    /// Build a store from already-decoded sprites (ids are their positions).
    pub fn from_sprites(sprites: impl IntoIterator<Item = Sprite>) -> Self {
        Self {
            sprites: sprites.into_iter().map(Arc::new).enumerate().collect(),
        }
    }

    /// Decode every `.png` in `dir`. Bad files are logged and skipped; a missing
    /// directory yields an empty store.
    pub fn load_all(dir: &Path) -> Self {
        let files = match sticker_files(dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "sticker directory unreadable, no stickers");
                return Self::default();
            }
        };

        let mut sprites = BTreeMap::new();
        for (id, path) in files.iter().enumerate() {
            match load_sprite(path) {
                Ok(sprite) => {
                    debug!(id, path = %path.display(), w = sprite.width(), h = sprite.height(), "sticker loaded");
                    sprites.insert(id, Arc::new(sprite));
                }
                Err(e) => warn!(id, error = %e, "skipping sticker"),
            }
        }
        info!(loaded = sprites.len(), found = files.len(), dir = %dir.display(), "stickers ready");
        Self { sprites }
    }

    pub fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(&id).map(Arc::as_ref)
    }

    /// Loaded ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.sprites.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

fn sticker_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Decode one sticker. Images without alpha come back fully opaque.
pub fn load_sprite(path: &Path) -> Result<Sprite> {
    let img = image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(img.to_rgba8())
}
