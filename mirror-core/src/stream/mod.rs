//! Second-screen frame streaming.
//!
//! ```text
//! Renderer ──► FrameMailbox ──► CaptureLoop ──► FrameRing (2 slots) ──► RemoteLink
//!                    ▲               │
//!                    └── return ◄────┘ (copy fence)
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | `gpu`        | `GpuBackend` trait, handles, current-context guard   |
//! | `software`   | In-memory `SoftwareGpu` with an event trace          |
//! | `mailbox`    | Present mailbox trait and `LatestFrameMailbox`       |
//! | `layout`     | Single-screen framebuffer layout                     |
//! | `ring`       | Double-buffered staging slots                        |
//! | `phase`      | `StreamPhase` session state machine                  |
//! | `capture`    | The capture loop run on the capture thread           |
//! | `controller` | `StreamController` start/stop lifecycle              |

use std::time::Duration;

use crate::input::MIN_POLL_INTERVAL;

pub mod capture;
pub mod controller;
pub mod gpu;
pub mod layout;
pub mod mailbox;
pub mod phase;
pub mod ring;
pub mod software;

// ── StreamConfig ─────────────────────────────────────────────────

/// Configuration for [`StreamController`] and [`CaptureLoop`].
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Upper bound on one mailbox wait. Also bounds how long a stop
    /// request can go unnoticed.
    pub mailbox_timeout: Duration,
    /// Minimum spacing between controller snapshot fetches.
    pub poll_interval: Duration,
    /// Aspect ratio of the mirrored screen, `(width, height)`.
    pub screen_aspect: (u32, u32),
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mailbox_timeout: Duration::from_millis(200),
            poll_interval: MIN_POLL_INTERVAL,
            screen_aspect: layout::DEFAULT_SCREEN_ASPECT,
        }
    }
}

// ── Re-exports ───────────────────────────────────────────────────

pub use capture::{CaptureHandles, CaptureLoop, CaptureStats, CaptureStatsSnapshot, ConnectCallback};
pub use controller::{CAPTURE_THREAD_NAME, StreamController};
pub use gpu::{BYTES_PER_PIXEL, BufferId, CurrentContext, FenceId, GpuBackend, SurfaceId};
pub use layout::{DEFAULT_SCREEN_ASPECT, FramebufferLayout, MAX_DIMENSION, Rect};
pub use mailbox::{Frame, FrameMailbox, LatestFrameMailbox, PresentedFrame};
pub use phase::StreamPhase;
pub use ring::{FrameRing, FrameSlot, frame_size};
pub use software::{GpuEvent, GpuTrace, SoftwareGpu, Surface, SurfaceStore};
