//! Host-facing input devices backed by the [`InputDecoder`].
//!
//! The host input layer works with one trait per capability and builds
//! devices through a [`DeviceFactory`] from a [`ParamPackage`]. The remote
//! engine provides one implementation of each, all reading through a
//! shared decoder.

use std::sync::Arc;

use crate::input::decoder::{InputDecoder, TouchPoint};
use crate::input::mapping::{NativeAnalog, NativeButton};
use crate::input::params::ParamPackage;

// ── Capability traits ────────────────────────────────────────────

/// A digital button.
pub trait ButtonDevice: Send + Sync {
    fn status(&self) -> bool;
}

/// A two-axis analog stick, each axis in `[-1, 1]`.
pub trait AnalogDevice: Send + Sync {
    fn status(&self) -> (f32, f32);
}

/// A touch surface.
pub trait TouchDevice: Send + Sync {
    fn status(&self) -> TouchPoint;
}

/// Builds devices of kind `D` from textual parameters.
pub trait DeviceFactory<D: ?Sized>: Send + Sync {
    fn create(&self, params: &ParamPackage) -> Box<D>;
}

// ── Devices ──────────────────────────────────────────────────────

/// A remote button. `None` (unknown id) always reports released.
pub struct RemoteButton {
    decoder: Arc<InputDecoder>,
    button: Option<NativeButton>,
}

impl ButtonDevice for RemoteButton {
    fn status(&self) -> bool {
        self.button
            .is_some_and(|b| self.decoder.digital_button(b))
    }
}

/// A remote stick. `None` (unknown id) always reports centered.
pub struct RemoteAnalog {
    decoder: Arc<InputDecoder>,
    stick: Option<NativeAnalog>,
}

impl AnalogDevice for RemoteAnalog {
    fn status(&self) -> (f32, f32) {
        match self.stick {
            Some(stick) => self.decoder.analog_stick(stick),
            None => (0.0, 0.0),
        }
    }
}

pub struct RemoteTouch {
    decoder: Arc<InputDecoder>,
}

impl TouchDevice for RemoteTouch {
    fn status(&self) -> TouchPoint {
        self.decoder.touch_point()
    }
}

// ── Factories ────────────────────────────────────────────────────

/// Creates [`RemoteButton`]s from `button:<name>` parameters.
pub struct RemoteButtonFactory {
    decoder: Arc<InputDecoder>,
}

impl RemoteButtonFactory {
    pub fn new(decoder: Arc<InputDecoder>) -> Self {
        Self { decoder }
    }

    /// Parameters that bind `button` to the remote engine.
    pub fn button_mapping(button: NativeButton) -> ParamPackage {
        ParamPackage::remote().with("button", button.name())
    }
}

impl DeviceFactory<dyn ButtonDevice> for RemoteButtonFactory {
    fn create(&self, params: &ParamPackage) -> Box<dyn ButtonDevice> {
        let button = params.get("button").and_then(NativeButton::from_name);
        if button.is_none() {
            tracing::debug!("remote button params {params} name no known button");
        }
        Box::new(RemoteButton {
            decoder: Arc::clone(&self.decoder),
            button,
        })
    }
}

/// Creates [`RemoteAnalog`]s from `analog:<name>` parameters.
pub struct RemoteAnalogFactory {
    decoder: Arc<InputDecoder>,
}

impl RemoteAnalogFactory {
    pub fn new(decoder: Arc<InputDecoder>) -> Self {
        Self { decoder }
    }

    pub fn analog_mapping(stick: NativeAnalog) -> ParamPackage {
        ParamPackage::remote().with("analog", stick.name())
    }
}

impl DeviceFactory<dyn AnalogDevice> for RemoteAnalogFactory {
    fn create(&self, params: &ParamPackage) -> Box<dyn AnalogDevice> {
        let stick = params.get("analog").and_then(NativeAnalog::from_name);
        if stick.is_none() {
            tracing::debug!("remote analog params {params} name no known stick");
        }
        Box::new(RemoteAnalog {
            decoder: Arc::clone(&self.decoder),
            stick,
        })
    }
}

pub struct RemoteTouchFactory {
    decoder: Arc<InputDecoder>,
}

impl RemoteTouchFactory {
    pub fn new(decoder: Arc<InputDecoder>) -> Self {
        Self { decoder }
    }

    pub fn touch_mapping() -> ParamPackage {
        ParamPackage::remote()
    }
}

impl DeviceFactory<dyn TouchDevice> for RemoteTouchFactory {
    fn create(&self, _params: &ParamPackage) -> Box<dyn TouchDevice> {
        Box::new(RemoteTouch {
            decoder: Arc::clone(&self.decoder),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
