// Background recompute for live frames: one job in flight, extra frames dropped.
//
// Jobs run on the rayon pool and report back over a channel; the event loop
// polls it once per tick and hands results to `EditSession::commit`, which
// throws away anything a newer mutation has overtaken.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::{error, trace};

use crate::session::{EditSession, Recomputed};
use crate::types::Frame;

pub struct RecomputeWorker {
    tx: Sender<Option<Recomputed>>,
    rx: Receiver<Option<Recomputed>>,
    busy: bool,
    dropped: u64,
}

impl Default for RecomputeWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecomputeWorker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, busy: false, dropped: 0 }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Frames dropped because a recompute was still running.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Start recomputing `frame` unless a job is already running, in which case
    /// the frame is dropped. Returns whether the frame was taken.
    pub fn offer(&mut self, session: &mut EditSession, frame: Frame) -> bool {
        if self.busy {
            self.dropped += 1;
            trace!(dropped = self.dropped, "worker busy, frame dropped");
            return false;
        }
        let job = session.prepare_frame(frame);
        let tx = self.tx.clone();
        self.busy = true;
        rayon::spawn(move || {
            let revision = job.revision();
            let result = panic::catch_unwind(AssertUnwindSafe(|| job.run()));
            let msg = match result {
                Ok(done) => Some(done),
                Err(_) => {
                    error!(revision, "recompute panicked, frame discarded");
                    None
                }
            };
            let _ = tx.send(msg);
        });
        true
    }

    /// Non-blocking: commit a finished job if one is waiting.
    /// `Some(true)` = new render installed, `Some(false)` = stale or failed, `None` = nothing yet.
    pub fn poll(&mut self, session: &mut EditSession) -> Option<bool> {
        match self.rx.try_recv() {
            Ok(msg) => Some(self.finish(session, msg)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the running job (if any) finishes and commit it.
    pub fn wait(&mut self, session: &mut EditSession) -> Option<bool> {
        if !self.busy {
            return None;
        }
        let msg = self.rx.recv().ok()?;
        Some(self.finish(session, msg))
    }

    fn finish(&mut self, session: &mut EditSession, msg: Option<Recomputed>) -> bool {
        self.busy = false;
        let Some(done) = msg else {
            return false;
        };
        let revision = done.revision();
        let landed = session.commit(done);
        if !landed {
            trace!(revision, "worker result overtaken");
        }
        landed
    }
}
