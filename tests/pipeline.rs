//! End-to-end behaviour of the filter → sticker → undo pipeline.

use std::sync::Arc;

use image::{Rgb, Rgba};
use sticker_cam::compositor::{self, blend};
use sticker_cam::filters::{self, Filter};
use sticker_cam::mapper::to_native_pixel;
use sticker_cam::worker::RecomputeWorker;
use sticker_cam::{EditSession, Error, Frame, Placement, Sprite, SpriteStore};

fn white_square(size: u32) -> Sprite {
    Sprite::from_pixel(size, size, Rgba([255, 255, 255, 255]))
}

/// 5x5 ring: opaque border, transparent centre.
fn ring() -> Sprite {
    Sprite::from_fn(5, 5, |x, y| {
        if x == 0 || y == 0 || x == 4 || y == 4 {
            Rgba([200, 30, 60, 255])
        } else {
            Rgba([1, 2, 3, 0])
        }
    })
}

fn store() -> Arc<SpriteStore> {
    Arc::new(SpriteStore::from_sprites([white_square(10), ring(), white_square(3)]))
}

fn noise(w: u32, h: u32) -> Frame {
    Frame::from_fn(w, h, |x, y| {
        let v = x.wrapping_mul(73).wrapping_add(y.wrapping_mul(151)) ^ (x * y);
        Rgb([v as u8, (v >> 3) as u8, (v >> 5) as u8])
    })
}

fn history() -> Vec<Placement> {
    vec![
        Placement { origin_x: 3, origin_y: 4, sprite: 0 },
        Placement { origin_x: 6, origin_y: 6, sprite: 1 },
        Placement { origin_x: -2, origin_y: 35, sprite: 2 },
        Placement { origin_x: 38, origin_y: -4, sprite: 0 },
        Placement { origin_x: 5, origin_y: 8, sprite: 1 },
    ]
}

#[test]
fn replay_is_deterministic() {
    let sprites = store();
    let base = noise(40, 40);
    let a = compositor::replay(&base, &history(), &sprites);
    let b = compositor::replay(&base, &history(), &sprites);
    assert_eq!(a.as_raw(), b.as_raw());
}

#[test]
fn rollback_is_the_inverse_of_place() {
    let sprites = store();
    let base = noise(40, 40);
    let mut s = EditSession::new(Arc::clone(&sprites));
    s.load_image(base.clone());
    s.set_filter(Filter::Blur);

    for p in history() {
        let before = s.render_buffer().unwrap().clone();
        let sprite = sprites.get(p.sprite).unwrap();
        let cx = p.origin_x + sprite.width() as i64 / 2;
        let cy = p.origin_y + sprite.height() as i64 / 2;
        let placed = s.place(cx, cy, p.sprite).unwrap();
        assert_eq!(placed, p);

        s.rollback().unwrap();
        assert_eq!(s.render_buffer().unwrap(), &before);
        s.place(cx, cy, p.sprite).unwrap();
    }

    let expected = compositor::replay(&filters::apply(&base, Filter::Blur), &history(), &sprites);
    assert_eq!(s.render_buffer().unwrap(), &expected);
}

#[test]
fn transparent_pixels_never_touch_the_target() {
    let base = noise(9, 9);
    let mut target = base.clone();
    blend(&mut target, &ring(), 2, 2);

    for y in 0..9 {
        for x in 0..9 {
            let inside_ring = (2..7).contains(&x) && (2..7).contains(&y);
            let border = inside_ring && (x == 2 || y == 2 || x == 6 || y == 6);
            let got = target.get_pixel(x, y).0;
            if border {
                assert_eq!(got, [200, 30, 60], "({x},{y}) should be fully replaced");
            } else {
                assert_eq!(got, base.get_pixel(x, y).0, "({x},{y}) should be untouched");
            }
        }
    }
}

#[test]
fn placements_at_and_beyond_every_edge_are_safe() {
    let sprites = store();
    let mut s = EditSession::new(Arc::clone(&sprites));
    s.load_image(Frame::new(20, 12));
    for (x, y) in [(0, 0), (19, 11), (-5, 6), (25, 6), (10, -5), (10, 17), (-100, -100), (1000, 1000)] {
        s.place(x, y, 0).unwrap();
        assert_eq!(s.render_buffer().unwrap().dimensions(), (20, 12));
    }
    // The two corner clicks each leave a clipped quarter of the 10x10 square.
    let white = s.render_buffer().unwrap().pixels().filter(|p| p.0 == [255; 3]).count();
    assert!(white > 0);
    assert_eq!(s.history().len(), 8);
}

#[test]
fn mapping_without_letterbox_is_identity() {
    for (x, y) in [(0u32, 0u32), (13, 77), (255, 255)] {
        assert_eq!(
            to_native_pixel(x as f32, y as f32, 256, 256, 256, 256).unwrap(),
            (x as i64, y as i64)
        );
    }
}

#[test]
fn unknown_filter_id_returns_input() {
    let img = noise(16, 9);
    assert_eq!(filters::apply_named(&img, "nonexistent-id"), img);
}

#[test]
fn white_square_on_black_then_rollback() {
    let mut s = EditSession::new(store());
    s.load_image(Frame::new(100, 100));
    s.place(50, 50, 0).unwrap();

    let r = s.render_buffer().unwrap();
    for y in 0..100 {
        for x in 0..100 {
            let in_square = (45..55).contains(&x) && (45..55).contains(&y);
            let expected = if in_square { [255, 255, 255] } else { [0, 0, 0] };
            assert_eq!(r.get_pixel(x, y).0, expected, "({x},{y})");
        }
    }

    s.rollback().unwrap();
    assert!(s.render_buffer().unwrap().pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn sticker_colours_survive_grayscale() {
    let sprites = Arc::new(SpriteStore::from_sprites([Sprite::from_pixel(4, 4, Rgba([255, 0, 0, 255]))]));
    let mut s = EditSession::new(sprites);
    s.load_image(Frame::from_pixel(12, 12, Rgb([30, 160, 90])));
    s.set_filter(Filter::Gray);
    s.place(6, 6, 0).unwrap();

    let r = s.render_buffer().unwrap();
    assert_eq!(r.get_pixel(6, 6).0, [255, 0, 0]);
    let bg = r.get_pixel(0, 0).0;
    assert_eq!(bg[0], bg[1]);
    assert_eq!(bg[1], bg[2]);

    // Switching filters again keeps the sticker un-filtered.
    s.set_filter(Filter::Threshold);
    assert_eq!(s.render_buffer().unwrap().get_pixel(6, 6).0, [255, 0, 0]);
}

#[test]
fn stickers_follow_a_live_stream() {
    let mut s = EditSession::new(store());
    let mut worker = RecomputeWorker::new();

    assert!(worker.offer(&mut s, noise(30, 30)));
    assert_eq!(worker.wait(&mut s), Some(true));
    s.place(15, 15, 2).unwrap();

    for frame_no in 0..5u8 {
        let frame = Frame::from_pixel(30, 30, Rgb([frame_no * 10, 0, 0]));
        assert!(worker.offer(&mut s, frame));
        assert_eq!(worker.wait(&mut s), Some(true));
        let r = s.render_buffer().unwrap();
        assert_eq!(r.get_pixel(15, 15).0, [255, 255, 255]);
        assert_eq!(r.get_pixel(0, 0).0, [frame_no * 10, 0, 0]);
    }
    assert_eq!(s.history().len(), 1);
}

#[test]
fn empty_session_edits_are_reported_not_fatal() {
    let mut s = EditSession::new(store());
    assert!(matches!(s.place(0, 0, 0), Err(Error::EmptySession)));
    assert!(matches!(s.rollback(), Err(Error::EmptySession)));
    s.set_filter_named("gray");
    assert_eq!(s.active_filter(), Filter::Gray);
    assert!(s.render_buffer().is_none());
}
