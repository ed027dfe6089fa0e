// Window glue: shows the render buffer and reports keys and clicks.
// The window letterboxes the frame to keep its aspect ratio; clicks come back
// in raw window pixels and go through `mapper` before reaching the session.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, ScaleMode, Window, WindowOptions};
use sticker_cam::error::Error;
use sticker_cam::types::{Frame, FrameBuffer};

pub struct Drawer {
    window: Window,      // the on-screen window you see
    screen: FrameBuffer, // packed copy of the last frame pushed
    mouse_was_down: bool,
}

impl Drawer {
    /// Create a resizable window sized to the first frame.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let opts = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, width, height, opts)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self {
            window,
            screen: FrameBuffer::new(width, height),
            mouse_was_down: false,
        })
    }

    /// Push a frame to the screen at its native resolution; the window scales it.
    pub fn present(&mut self, frame: &Frame) -> Result<(), Error> {
        self.screen.fill_from(frame);
        self.window
            .update_with_buffer(&self.screen.pixels, self.screen.width, self.screen.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Keep the window responsive when there is nothing to show yet.
    pub fn present_blank(&mut self) -> Result<(), Error> {
        let (w, h) = self.surface_size();
        if w == 0 || h == 0 {
            self.window.update();
            return Ok(());
        }
        self.screen = FrameBuffer::new(w, h);
        self.window
            .update_with_buffer(&self.screen.pixels, w, h)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// Sticker slot picked with the number row: `1` → 0 … `9` → 8.
    pub fn digit_pressed_once(&self) -> Option<usize> {
        const DIGITS: [Key; 9] = [
            Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
            Key::Key6, Key::Key7, Key::Key8, Key::Key9,
        ];
        DIGITS.iter().position(|k| self.pressed_once(*k))
    }

    /// Window-pixel position of a fresh left click (press edge only).
    pub fn click(&mut self) -> Option<(f32, f32)> {
        let down = self.window.get_mouse_down(MouseButton::Left);
        let pressed = down && !self.mouse_was_down;
        self.mouse_was_down = down;
        if !pressed {
            return None;
        }
        self.window.get_unscaled_mouse_pos(MouseMode::Discard)
    }

    /// Current drawable size of the window in pixels.
    pub fn surface_size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}
