//! Single-screen framebuffer layout negotiated with the remote display.

use tracing::warn;

use crate::link::RemoteLink;
use crate::stream::gpu::BYTES_PER_PIXEL;

/// Aspect ratio of the mirrored screen (the 320x240 touch screen).
pub const DEFAULT_SCREEN_ASPECT: (u32, u32) = (4, 3);

/// Largest width or height a remote display may request.
pub const MAX_DIMENSION: u32 = 16_384;

/// Pixel rectangle, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Size of the streamed frame and where the screen sits inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferLayout {
    pub width: u32,
    pub height: u32,
    /// The mirrored screen, aspect-preserved and centered.
    pub screen: Rect,
}

impl FramebufferLayout {
    /// Fit a screen of `aspect` (`width:height`) into `width x height`.
    ///
    /// A zero aspect component fills the whole frame.
    pub fn single_frame(width: u32, height: u32, aspect: (u32, u32)) -> Self {
        let (aw, ah) = (aspect.0 as u64, aspect.1 as u64);
        let (w, h) = (width as u64, height as u64);

        let (sw, sh) = if aw == 0 || ah == 0 {
            (w, h)
        } else if w * ah > h * aw {
            // Frame is wider than the screen: pillarbox.
            (h * aw / ah, h)
        } else {
            // Frame is taller than the screen: letterbox.
            (w, w * ah / aw)
        };

        let left = ((w - sw) / 2) as u32;
        let top = ((h - sh) / 2) as u32;
        Self {
            width,
            height,
            screen: Rect {
                left,
                top,
                right: left + sw as u32,
                bottom: top + sh as u32,
            },
        }
    }

    /// Lay a single screen out in a remote-requested `resolution`.
    ///
    /// A side above [`MAX_DIMENSION`] yields an empty layout, which no
    /// staging buffer can be allocated for.
    pub fn fit(resolution: (u32, u32), aspect: (u32, u32)) -> Self {
        let (width, height) = resolution;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            warn!("remote requested {width}x{height}, above the {MAX_DIMENSION} limit");
            return Self::single_frame(0, 0, aspect);
        }
        Self::single_frame(width, height, aspect)
    }

    /// Ask `link` for its resolution and lay a single screen out in it.
    pub fn negotiate(link: &dyn RemoteLink, aspect: (u32, u32)) -> Self {
        Self::fit(link.requested_resolution(), aspect)
    }

    /// Fraction of the frame width covered by the screen.
    pub fn horizontal_coverage(&self) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        self.screen.width() as f32 / self.width as f32
    }

    /// Bytes in one tightly packed frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL as usize
    }

    /// Bytes per row. Saturates for widths no ring can hold.
    pub fn stride(&self) -> u32 {
        self.width.saturating_mul(BYTES_PER_PIXEL)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// ── Tests ────────────────────────────────────────────────────────
