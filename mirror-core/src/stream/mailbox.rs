//! Handoff of completed render frames from the render thread.
//!
//! The mailbox holds at most one ready frame. A producer that outpaces
//! the capture thread overwrites the pending frame instead of queuing a
//! backlog, so the capture thread always sees the newest frame.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::stream::gpu::{FenceId, SurfaceId};

// ── Frame ────────────────────────────────────────────────────────

/// A completed render frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Producer-assigned sequence number.
    pub id: u64,
    /// Render target holding the pixels.
    pub surface: SurfaceId,
    pub width: u32,
    pub height: u32,
    /// Set by the producer when the backing store was recreated.
    pub color_reloaded: bool,
    /// Signaled once rendering into `surface` has finished.
    pub render_fence: FenceId,
}

// ── FrameMailbox ─────────────────────────────────────────────────

/// Consumer side of the render-frame handoff.
pub trait FrameMailbox: Send + Sync {
    /// Wait up to `timeout` for a ready frame.
    fn try_get_ready_frame(&self, timeout: Duration) -> Option<Frame>;

    /// Tell the producer the consumer needs `frame` at `width x height`.
    /// Clears `frame.color_reloaded`.
    fn notify_frame_reloaded(&self, frame: &mut Frame, width: u32, height: u32);

    /// Hand `frame` back to the producer.
    ///
    /// `present_fence` is signaled once the consumer's copy has
    /// finished. It is `None` when the frame was not read at all.
    fn return_frame(&self, frame: Frame, present_fence: Option<FenceId>);
}

// ── LatestFrameMailbox ───────────────────────────────────────────

/// A frame handed back by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    pub frame: Frame,
    pub present_fence: Option<FenceId>,
}

#[derive(Default)]
struct MailboxInner {
    pending: Option<Frame>,
    presented: Vec<PresentedFrame>,
    reload_request: Option<(u32, u32)>,
    dropped: u64,
}

/// Single-slot [`FrameMailbox`] guarded by a mutex and condition
/// variable.
#[derive(Default)]
pub struct LatestFrameMailbox {
    inner: Mutex<MailboxInner>,
    ready: Condvar,
}

impl LatestFrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `frame`, replacing any frame not yet taken.
    pub fn submit(&self, frame: Frame) {
        let mut inner = self.inner.lock();
        if inner.pending.replace(frame).is_some() {
            inner.dropped += 1;
        }
        drop(inner);
        self.ready.notify_one();
    }

    /// Frames returned by the consumer since the last call.
    pub fn take_presented(&self) -> Vec<PresentedFrame> {
        std::mem::take(&mut self.inner.lock().presented)
    }

    /// Size the consumer last asked for, if it asked since the last call.
    pub fn take_reload_request(&self) -> Option<(u32, u32)> {
        self.inner.lock().reload_request.take()
    }

    /// Frames overwritten before the consumer took them.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }
}

impl FrameMailbox for LatestFrameMailbox {
    fn try_get_ready_frame(&self, timeout: Duration) -> Option<Frame> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.pending.is_none() {
            if self.ready.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
        }
        inner.pending.take()
    }

    fn notify_frame_reloaded(&self, frame: &mut Frame, width: u32, height: u32) {
        frame.width = width;
        frame.height = height;
        frame.color_reloaded = false;
        self.inner.lock().reload_request = Some((width, height));
    }

    fn return_frame(&self, frame: Frame, present_fence: Option<FenceId>) {
        self.inner.lock().presented.push(PresentedFrame {
            frame,
            present_fence,
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────
