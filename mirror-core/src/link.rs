//! The remote session capability consumed by the pipeline.
//!
//! Connection setup, the wire format and pixel compression all live
//! behind [`RemoteLink`]. The pipeline only asks four questions of it.
//! [`LoopbackLink`] is an in-process implementation for the host harness
//! and tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::input::state::ControllerState;

// ── RemoteLink ───────────────────────────────────────────────────

/// A connected (or not) remote secondary display.
///
/// Implementations are shared between the capture thread and any number
/// of input callers, so every method takes `&self`.
pub trait RemoteLink: Send + Sync {
    /// Whether a remote client is currently attached.
    fn is_connected(&self) -> bool;

    /// Latest controller snapshot reported by the remote client.
    fn controller_snapshot(&self) -> ControllerState;

    /// Resolution the remote display asked for, as `(width, height)`.
    fn requested_resolution(&self) -> (u32, u32);

    /// Forward one frame. `pixels` holds `height` rows of `stride` bytes.
    ///
    /// Returns `false` when the frame could not be handed to the
    /// transport.
    fn send_frame(&self, pixels: &[u8], width: u32, height: u32, stride: u32) -> bool;
}

// ── LoopbackLink ─────────────────────────────────────────────────

/// Record of the last frame accepted by a [`LoopbackLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    /// First four bytes of the frame, enough to identify test patterns.
    pub head: [u8; 4],
    pub len: usize,
}

/// An in-process [`RemoteLink`] with scriptable behaviour.
///
/// Connectivity, the controller snapshot and the requested resolution
/// can be changed at any time from any thread. The link counts snapshot
/// fetches and sent frames so callers can observe the pipeline.
pub struct LoopbackLink {
    connected: AtomicBool,
    state: Mutex<ControllerState>,
    resolution: Mutex<(u32, u32)>,
    fetches: AtomicUsize,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    /// Number of upcoming `send_frame` calls that should report failure.
    failing_sends: AtomicUsize,
    last_frame: Mutex<Option<SentFrame>>,
}

impl LoopbackLink {
    /// A disconnected link asking for `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            connected: AtomicBool::new(false),
            state: Mutex::new(ControllerState::default()),
            resolution: Mutex::new((width, height)),
            fetches: AtomicUsize::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            failing_sends: AtomicUsize::new(0),
            last_frame: Mutex::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Replace the snapshot the remote side reports.
    pub fn set_state(&self, state: ControllerState) {
        *self.state.lock() = state;
    }

    pub fn set_resolution(&self, width: u32, height: u32) {
        *self.resolution.lock() = (width, height);
    }

    /// Make the next `count` sends report failure.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::Release);
    }

    /// How many snapshots have been fetched.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }

    /// How many frames were accepted.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Acquire)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Acquire)
    }

    pub fn last_frame(&self) -> Option<SentFrame> {
        self.last_frame.lock().clone()
    }
}

impl RemoteLink for LoopbackLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn controller_snapshot(&self) -> ControllerState {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        *self.state.lock()
    }

    fn requested_resolution(&self) -> (u32, u32) {
        *self.resolution.lock()
    }

    fn send_frame(&self, pixels: &[u8], width: u32, height: u32, stride: u32) -> bool {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failing || !self.is_connected() {
            return false;
        }

        let mut head = [0u8; 4];
        let n = pixels.len().min(4);
        head[..n].copy_from_slice(&pixels[..n]);

        *self.last_frame.lock() = Some(SentFrame {
            width,
            height,
            stride,
            head,
            len: pixels.len(),
        });
        self.frames_sent.fetch_add(1, Ordering::AcqRel);
        self.bytes_sent
            .fetch_add(pixels.len() as u64, Ordering::AcqRel);
        true
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::state::Buttons;

    #[test]
    fn starts_disconnected() {
        let link = LoopbackLink::new(854, 480);
        assert!(!link.is_connected());
        assert_eq!(link.requested_resolution(), (854, 480));
    }

    #[test]
    fn snapshot_fetches_are_counted() {
        let link = LoopbackLink::new(1, 1);
        link.set_state(ControllerState::with_buttons(Buttons::X));
        assert_eq!(link.fetch_count(), 0);
        assert!(link.controller_snapshot().pressed(Buttons::X));
        assert_eq!(link.fetch_count(), 1);
    }

    #[test]
    fn send_records_frame_when_connected() {
        let link = LoopbackLink::new(2, 1);
        let pixels = [9u8, 8, 7, 6, 5, 4, 3, 2];

        assert!(!link.send_frame(&pixels, 2, 1, 8));
        assert_eq!(link.frames_sent(), 0);

        link.set_connected(true);
        assert!(link.send_frame(&pixels, 2, 1, 8));
        let sent = link.last_frame().unwrap();
        assert_eq!(sent.head, [9, 8, 7, 6]);
        assert_eq!(sent.len, 8);
        assert_eq!(link.bytes_sent(), 8);
    }

    #[test]
    fn injected_send_failures_run_out() {
        let link = LoopbackLink::new(1, 1);
        link.set_connected(true);
        link.fail_next_sends(2);

        assert!(!link.send_frame(&[0; 4], 1, 1, 4));
        assert!(!link.send_frame(&[0; 4], 1, 1, 4));
        assert!(link.send_frame(&[0; 4], 1, 1, 4));
        assert_eq!(link.frames_sent(), 1);
    }
}
