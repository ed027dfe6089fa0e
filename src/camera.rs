// Opens a camera on its own thread and hands RGB frames to the event loop.
// The thread blocks on the device; the loop only ever does a `try_recv`. At most
// one frame waits in the channel, anything grabbed while it is full is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use sticker_cam::error::Error;
use sticker_cam::types::Frame;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

// A small wrapper around nokhwa::Camera; lives entirely on the capture thread.
struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index` near the requested resolution and start streaming.
    fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );

        // Ask for RGB frames, taking whatever the device offers closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("open stream: {e}")))?;

        // The stream may have settled on a different resolution.
        let actual = cam.resolution();

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
        })
    }

    /// Grab and decode one frame (blocks until the device delivers).
    fn capture_frame(&mut self) -> Result<Frame, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::NoFrame(format!("fetch: {e}")))?;

        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::NoFrame(format!("decode RGB: {e}")))?;

        // Go through the raw bytes so we don't depend on nokhwa's `image` version.
        let (w, h) = rgb.dimensions();
        Frame::from_raw(w, h, rgb.into_raw())
            .ok_or_else(|| Error::NoFrame(format!("short RGB buffer for {w}x{h}")))
    }

    /// Report the actual resolution the camera is delivering.
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Stop streaming and release the device.
    fn release(mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!(error = %e, "camera did not stop cleanly");
        }
    }
}

/// Back-off after a failed grab so a broken device doesn't spin the thread.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Handle to a running capture thread.
pub struct CameraFeed {
    frames: Receiver<Frame>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    width: u32,
    height: u32,
}

impl CameraFeed {
    /// Open camera `index` on a capture thread and wait until it is streaming.
    pub fn start(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u32), Error>>();
        let (frame_tx, frames) = mpsc::sync_channel::<Frame>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("camera".into())
            .spawn(move || {
                let mut cam = match CameraCapture::new(index, width, height) {
                    Ok(cam) => {
                        let _ = ready_tx.send(Ok(cam.resolution()));
                        cam
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let dropped = pump(|| cam.capture_frame(), &frame_tx, &flag);
                debug!(dropped, "capture thread exiting");
                cam.release();
            })
            .map_err(|e| Error::CameraInit(format!("spawn capture thread: {e}")))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(Error::CameraInit("capture thread exited early".into())));
        match ready {
            Ok((width, height)) => Ok(Self { frames, stop, handle, width, height }),
            Err(e) => {
                let _ = handle.join();
                Err(e)
            }
        }
    }

    /// Newest waiting frame, if the camera has delivered one since the last call.
    pub fn try_frame(&self) -> Option<Frame> {
        match self.frames.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                trace!("capture thread gone");
                None
            }
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ask the thread to stop and wait for it to release the device.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        drop(self.frames);
        if self.handle.join().is_err() {
            warn!("capture thread panicked");
        }
    }
}

/// Grab frames until `stop` is set or the receiver goes away.
/// Returns how many frames were dropped because the slot was still full.
fn pump(
    mut grab: impl FnMut() -> Result<Frame, Error>,
    tx: &SyncSender<Frame>,
    stop: &AtomicBool,
) -> u64 {
    let mut dropped = 0;
    while !stop.load(Ordering::Relaxed) {
        match grab() {
            Ok(frame) => match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    trace!(dropped, "event loop behind, camera frame dropped");
                }
                Err(TrySendError::Disconnected(_)) => break,
            },
            Err(e) => {
                debug!(error = %e, "no frame this grab");
                thread::sleep(RETRY_DELAY);
            }
        }
    }
    dropped
}
