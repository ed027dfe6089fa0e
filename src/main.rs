// What you SEE:
// • Live camera (or the --image file) with the selected filter applied.
// • 1–9 pick a sticker, left click stamps it centred on the cursor.
// • Backspace / Z removes the newest sticker. F / G cycle filters.
// • Space stops/restarts the camera (stickers stay), L reloads --image, S saves.
// • ESC quits.

mod camera;
mod draw;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use minifb::Key;
use tracing::{debug, error, info, warn};

use camera::CameraFeed;
use draw::Drawer;
use sticker_cam::config::Config;
use sticker_cam::error::Error;
use sticker_cam::worker::RecomputeWorker;
use sticker_cam::{io, mapper, EditSession, SpriteId, SpriteStore};

fn open_camera(cfg: &Config) -> Option<CameraFeed> {
    match CameraFeed::start(cfg.camera_index, cfg.width, cfg.height) {
        Ok(cam) => {
            let (w, h) = cam.resolution();
            info!(index = cfg.camera_index, w, h, "camera streaming");
            Some(cam)
        }
        Err(e) => {
            error!(error = %e, "camera unavailable, continuing without live capture");
            None
        }
    }
}

fn stop_camera(camera: &mut Option<CameraFeed>, worker: &mut RecomputeWorker, session: &mut EditSession) {
    if let Some(cam) = camera.take() {
        // Let the in-flight frame land so the frozen image is the last one seen.
        worker.wait(session);
        cam.stop();
        info!("live capture stopped");
    }
}

fn main() -> Result<(), Error> {
    let cfg = Config::parse();
    cfg.init_logging();

    /* --- Stickers + session --- */
    let sprites = Arc::new(SpriteStore::load_all(&cfg.stickers));
    let mut session = EditSession::new(Arc::clone(&sprites));
    session.set_filter_named(&cfg.filter);
    if let Some(path) = &cfg.image {
        if let Err(e) = session.load_file(path) {
            error!(error = %e, "startup image not loaded");
        }
    }

    /* --- Camera + window --- */
    let mut camera = if cfg.no_camera || session.is_loaded() { None } else { open_camera(&cfg) };
    let (w, h) = match (&camera, session.render_buffer()) {
        (Some(cam), _) => cam.resolution(),
        (None, Some(frame)) => frame.dimensions(),
        (None, None) => (cfg.width, cfg.height),
    };
    let mut drawer = Drawer::new("Sticker Cam", w as usize, h as usize)?;

    let mut worker = RecomputeWorker::new();
    let mut selected: Option<SpriteId> = sprites.ids().next();
    let poll = cfg.poll_interval();
    let mut last_poll: Option<Instant> = None;

    /* --- FPS for the title bar --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut fps = 0.0f32;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Land any finished live-frame recompute. */
        worker.poll(&mut session);

        /* 2) Offer the newest camera frame; it is dropped if the worker is still busy. */
        if let Some(cam) = camera.as_ref() {
            if last_poll.is_none_or(|t| t.elapsed() >= poll) {
                last_poll = Some(Instant::now());
                if let Some(frame) = cam.try_frame() {
                    worker.offer(&mut session, frame);
                }
            }
        }

        /* 3) Inputs */
        if drawer.pressed_once(Key::Space) {
            if camera.is_some() {
                stop_camera(&mut camera, &mut worker, &mut session);
            } else {
                camera = open_camera(&cfg);
            }
        }

        if drawer.pressed_once(Key::L) {
            match &cfg.image {
                Some(path) => {
                    stop_camera(&mut camera, &mut worker, &mut session);
                    if let Err(e) = session.load_file(path) {
                        error!(error = %e, "load failed");
                    }
                }
                None => warn!("no --image given, nothing to load"),
            }
        }

        if drawer.pressed_once(Key::S) {
            match session.render_buffer() {
                Some(frame) => {
                    if let Err(e) = io::save(frame, &cfg.output) {
                        error!(error = %e, "save failed");
                    }
                }
                None => warn!("nothing to save yet"),
            }
        }

        if drawer.pressed_once(Key::F) {
            session.set_filter(session.active_filter().next());
            info!(filter = session.active_filter().name(), "filter");
        }
        if drawer.pressed_once(Key::G) {
            session.set_filter(session.active_filter().previous());
            info!(filter = session.active_filter().name(), "filter");
        }

        if let Some(slot) = drawer.digit_pressed_once() {
            if sprites.get(slot).is_some() {
                selected = Some(slot);
                info!(sticker = slot + 1, "sticker selected");
            } else {
                warn!(sticker = slot + 1, "no such sticker");
            }
        }

        if drawer.pressed_once(Key::Backspace) || drawer.pressed_once(Key::Z) {
            match session.rollback() {
                Ok(Some(p)) => debug!(?p, "rolled back"),
                Ok(None) => debug!("nothing to roll back"),
                Err(e) => warn!(error = %e, "rollback ignored"),
            }
        }

        if let Some((cx, cy)) = drawer.click() {
            let image_size = session.render_buffer().map(|f| f.dimensions());
            if let (Some(sprite), Some((iw, ih))) = (selected, image_size) {
                let (dw, dh) = drawer.surface_size();
                match mapper::to_native_pixel(cx, cy, dw, dh, iw, ih) {
                    Ok((nx, ny)) => {
                        if let Err(e) = session.place(nx, ny, sprite) {
                            warn!(error = %e, "placement ignored");
                        }
                    }
                    Err(e) => warn!(error = %e, "click ignored"),
                }
            } else {
                debug!("click with no sticker or no image");
            }
        }

        /* 4) Present */
        match session.render_buffer() {
            Some(frame) => drawer.present(frame)?,
            None => drawer.present_blank()?,
        }

        /* 5) Title bar: mode, filter, sticker, FPS */
        frames_this_second += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            fps = frames_this_second as f32 / now.duration_since(last_fps_time).as_secs_f32();
            frames_this_second = 0;
            last_fps_time = now;
            debug!(fps, dropped = worker.dropped(), "frame stats");
        }
        let mode = if camera.is_some() { "LIVE" } else { "STILL" };
        let sticker = selected.map_or_else(|| "-".to_string(), |s| (s + 1).to_string());
        drawer.set_title(&format!(
            "Sticker Cam | {mode} | filter: {} | sticker: {sticker} | placed: {} | FPS {fps:.1}",
            session.active_filter().name(),
            session.history().len(),
        ));
    }

    stop_camera(&mut camera, &mut worker, &mut session);
    Ok(())
}
