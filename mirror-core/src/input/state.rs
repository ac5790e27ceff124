//! Raw controller snapshot as delivered by the remote device.
//!
//! A [`ControllerState`] is produced whole by the
//! [`RemoteLink`](crate::link::RemoteLink) and copied around by value.
//! Nothing in the pipeline mutates a single field of a snapshot that is
//! already cached.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Raw value of a centered analog axis.
pub const STICK_CENTER: u8 = 127;

bitflags! {
    /// Digital buttons reported by the remote controller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u16 {
        const A       = 1 << 0;
        const B       = 1 << 1;
        const X       = 1 << 2;
        const Y       = 1 << 3;
        const D_UP    = 1 << 4;
        const D_DOWN  = 1 << 5;
        const D_LEFT  = 1 << 6;
        const D_RIGHT = 1 << 7;
        const L       = 1 << 8;
        const R       = 1 << 9;
        const PLUS    = 1 << 10;
        const MINUS   = 1 << 11;
        const ZL      = 1 << 12;
        const ZR      = 1 << 13;
    }
}

/// One raw analog axis inside a [`ControllerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

// ── ControllerState ──────────────────────────────────────────────

/// A point-in-time snapshot of every remote input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Pressed digital buttons.
    pub buttons: Buttons,
    pub l_stick_x: u8,
    pub l_stick_y: u8,
    pub r_stick_x: u8,
    pub r_stick_y: u8,
    /// Raw touch position across the remote surface (0..=255).
    pub touch_x: u8,
    pub touch_y: u8,
    pub touch_down: bool,
}

impl Default for ControllerState {
    /// The neutral state: nothing pressed, sticks centered, no touch.
    fn default() -> Self {
        Self {
            buttons: Buttons::empty(),
            l_stick_x: STICK_CENTER,
            l_stick_y: STICK_CENTER,
            r_stick_x: STICK_CENTER,
            r_stick_y: STICK_CENTER,
            touch_x: 0,
            touch_y: 0,
            touch_down: false,
        }
    }
}

impl ControllerState {
    /// Neutral snapshot with the given buttons held.
    pub fn with_buttons(buttons: Buttons) -> Self {
        Self {
            buttons,
            ..Self::default()
        }
    }

    /// Whether every flag in `button` is pressed.
    pub fn pressed(&self, button: Buttons) -> bool {
        !button.is_empty() && self.buttons.contains(button)
    }

    /// Raw sample for one analog axis.
    pub fn axis(&self, axis: StickAxis) -> u8 {
        match axis {
            StickAxis::LeftX => self.l_stick_x,
            StickAxis::LeftY => self.l_stick_y,
            StickAxis::RightX => self.r_stick_x,
            StickAxis::RightY => self.r_stick_y,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
