//! Conversion of raw remote samples into host input values.
//!
//! Buttons come out as `bool`. Sticks come out as a vector inside the unit
//! circle. Touch comes out as a normalized point over the mirrored
//! viewport.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::input::mapping::{NativeAnalog, NativeButton};
use crate::input::poll::{MIN_POLL_INTERVAL, SnapshotCache};
use crate::input::state::{ControllerState, STICK_CENTER};
use crate::link::RemoteLink;

/// Full span of an 8-bit touch sample.
const TOUCH_RANGE: f32 = 255.0;

/// Fraction of the remote surface width covered by the mirrored screen
/// when a 4:3 viewport is centered in an 854x480 frame.
pub const DEFAULT_VIEWPORT_COVERAGE: f32 = 640.0 / 854.0;

// ── Normalization ────────────────────────────────────────────────

/// Map a raw 8-bit stick sample to roughly `[-1, 1]`.
pub fn normalize_axis(sample: u8) -> f32 {
    (sample as f32 / STICK_CENTER as f32) - 1.0
}

/// Scale `(x, y)` back onto the unit circle if it lies outside it.
pub fn clamp_to_unit_circle(x: f32, y: f32) -> (f32, f32) {
    let r2 = x * x + y * y;
    if r2 > 1.0 {
        let r = r2.sqrt();
        (x / r, y / r)
    } else {
        (x, y)
    }
}

/// A touch sample expressed over the mirrored viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchPoint {
    /// 0.0 at the viewport's left edge, 1.0 at its right edge.
    pub x: f32,
    /// 0.0 at the top, 1.0 at the bottom.
    pub y: f32,
    pub pressed: bool,
}

/// Remap a raw touch sample given the viewport's horizontal coverage of
/// the remote surface.
///
/// Samples that land in the side borders outside the viewport are
/// reported as released with `x = 0`.
pub fn remap_touch(state: &ControllerState, coverage: f32) -> TouchPoint {
    let y = state.touch_y as f32 / TOUCH_RANGE;

    let coverage = if coverage.is_finite() {
        coverage.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let border = TOUCH_RANGE * (1.0 - coverage) / 2.0;
    let interior = TOUCH_RANGE - 2.0 * border;

    let raw_x = state.touch_x as f32;
    if interior <= f32::EPSILON || raw_x < border || raw_x > TOUCH_RANGE - border {
        return TouchPoint {
            x: 0.0,
            y,
            pressed: false,
        };
    }

    TouchPoint {
        x: (raw_x - border) / interior,
        y,
        pressed: state.touch_down,
    }
}

// ── InputDecoder ─────────────────────────────────────────────────

/// Answers host input queries from the gated snapshot cache.
///
/// Every query is side-effect free apart from the gated poll. While the
/// link is down every query returns its neutral value.
pub struct InputDecoder {
    cache: SnapshotCache,
    /// `f32` bits of the viewport's horizontal coverage.
    coverage: AtomicU32,
}

impl InputDecoder {
    pub fn new(link: Arc<dyn RemoteLink>) -> Self {
        Self::with_interval(link, MIN_POLL_INTERVAL)
    }

    /// Decoder whose snapshot cache refreshes at most once per `interval`.
    pub fn with_interval(link: Arc<dyn RemoteLink>, interval: Duration) -> Self {
        Self {
            cache: SnapshotCache::with_interval(link, interval),
            coverage: AtomicU32::new(DEFAULT_VIEWPORT_COVERAGE.to_bits()),
        }
    }

    /// Update the viewport coverage used to crop touch samples, normally
    /// from [`FramebufferLayout::horizontal_coverage`](crate::stream::FramebufferLayout::horizontal_coverage).
    pub fn set_viewport_coverage(&self, coverage: f32) {
        self.coverage.store(coverage.to_bits(), Ordering::Release);
    }

    pub fn viewport_coverage(&self) -> f32 {
        f32::from_bits(self.coverage.load(Ordering::Acquire))
    }

    /// Whether `id` is held on the remote pad.
    pub fn digital_button(&self, id: NativeButton) -> bool {
        let Some(flag) = id.mapping() else {
            return false;
        };
        self.cache
            .poll()
            .is_some_and(|state| state.pressed(flag))
    }

    /// Position of stick `id`, clamped to the unit circle.
    pub fn analog_stick(&self, id: NativeAnalog) -> (f32, f32) {
        let Some(state) = self.cache.poll() else {
            return (0.0, 0.0);
        };
        let (axis_x, axis_y) = id.mapping();
        clamp_to_unit_circle(
            normalize_axis(state.axis(axis_x)),
            normalize_axis(state.axis(axis_y)),
        )
    }

    /// Current touch over the mirrored viewport.
    pub fn touch_point(&self) -> TouchPoint {
        match self.cache.poll() {
            Some(state) => remap_touch(&state, self.viewport_coverage()),
            None => TouchPoint::default(),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}

// ── Tests ────────────────────────────────────────────────────────
