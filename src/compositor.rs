// Compositor: stamps stickers onto a frame and rebuilds a frame from its placement history.
//
// Alpha is a mask here, not a weight: any alpha > 0 copies the sticker colour,
// alpha == 0 leaves the frame alone. Anything that falls outside the frame is
// dropped silently, so a sticker can hang off any edge.

use std::ops::Range;

use tracing::{trace, warn};

use crate::sprites::SpriteStore;
use crate::types::{Frame, Placement, Sprite};

/// Overlap of a sprite span `[origin, origin + len)` with `[0, limit)`,
/// returned as the sprite-local range that lands inside the target.
fn visible(origin: i64, len: u32, limit: u32) -> Range<usize> {
    let start = origin.saturating_neg().clamp(0, len as i64);
    let end = (limit as i64).saturating_sub(origin).clamp(0, len as i64);
    if start >= end {
        0..0
    } else {
        start as usize..end as usize
    }
}

/// Run `f(sprite_px, target_px)` for every sprite pixel that lands inside `target`.
/// Works row slice by row slice; nothing outside the overlap is ever touched.
fn for_each_overlap(
    target: &mut Frame,
    sprite: &Sprite,
    origin_x: i64,
    origin_y: i64,
    mut f: impl FnMut(&[u8], &mut [u8], usize),
) {
    let cols = visible(origin_x, sprite.width(), target.width());
    let rows = visible(origin_y, sprite.height(), target.height());
    if cols.is_empty() || rows.is_empty() {
        return;
    }

    let tw = target.width() as usize;
    let sw = sprite.width() as usize;
    let tx0 = (origin_x + cols.start as i64) as usize;
    let n = cols.len();
    let src = sprite.as_raw();
    let dst: &mut [u8] = target;

    for i in rows {
        let ty = (origin_y + i as i64) as usize;
        let s_row = &src[(i * sw + cols.start) * 4..(i * sw + cols.end) * 4];
        let t_start = (ty * tw + tx0) * 3;
        let t_row = &mut dst[t_start..t_start + n * 3];
        for (j, (s_px, t_px)) in s_row.chunks_exact(4).zip(t_row.chunks_exact_mut(3)).enumerate() {
            f(s_px, t_px, t_start + j * 3);
        }
    }
}

/// Copy `sprite` colour onto `target` wherever sprite alpha > 0.
pub fn blend(target: &mut Frame, sprite: &Sprite, origin_x: i64, origin_y: i64) {
    for_each_overlap(target, sprite, origin_x, origin_y, |s, t, _| {
        if s[3] > 0 {
            t.copy_from_slice(&s[..3]);
        }
    });
}

/// Inverse of [`blend`]: put `source` pixels back under the sprite's opaque footprint.
/// `source` must share `target`'s dimensions.
pub fn restore(target: &mut Frame, source: &Frame, sprite: &Sprite, origin_x: i64, origin_y: i64) {
    if source.dimensions() != target.dimensions() {
        warn!(
            dst = ?target.dimensions(),
            src = ?source.dimensions(),
            "restore skipped, size mismatch"
        );
        return;
    }
    let src = source.as_raw();
    for_each_overlap(target, sprite, origin_x, origin_y, |s, t, offset| {
        if s[3] > 0 {
            t.copy_from_slice(&src[offset..offset + 3]);
        }
    });
}

/// Stamp a single placement. Returns false when the sprite id is unknown.
pub fn apply_placement(target: &mut Frame, sprites: &SpriteStore, p: &Placement) -> bool {
    match sprites.get(p.sprite) {
        Some(sprite) => {
            blend(target, sprite, p.origin_x, p.origin_y);
            true
        }
        None => {
            warn!(sprite = p.sprite, "placement refers to unknown sprite, skipped");
            false
        }
    }
}

/// Copy of `base` with every placement in `history` stamped in order.
pub fn replay(base: &Frame, history: &[Placement], sprites: &SpriteStore) -> Frame {
    trace!(placements = history.len(), "replay");
    let mut out = base.clone();
    for p in history {
        apply_placement(&mut out, sprites, p);
    }
    out
}
