//! Remote controller input relay.
//!
//! ```text
//! RemoteLink ──► SnapshotCache (PollGate, 8 ms) ──► InputDecoder ──► Remote*Device
//! ```
//!
//! | Module     | Purpose                                            |
//! |------------|----------------------------------------------------|
//! | `state`    | Raw `ControllerState` snapshot and button flags    |
//! | `mapping`  | Native button / stick → snapshot field tables      |
//! | `poll`     | `PollGate` rate limiter and `SnapshotCache`        |
//! | `decoder`  | Normalization of buttons, sticks and touch         |
//! | `params`   | `ParamPackage` device parameters                   |
//! | `device`   | Device traits, remote devices and factories        |

pub mod decoder;
pub mod device;
pub mod mapping;
pub mod params;
pub mod poll;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────

pub use decoder::{DEFAULT_VIEWPORT_COVERAGE, InputDecoder, TouchPoint};
pub use device::{
    AnalogDevice, ButtonDevice, DeviceFactory, RemoteAnalogFactory, RemoteButtonFactory,
    RemoteTouchFactory, TouchDevice,
};
pub use mapping::{NativeAnalog, NativeButton};
pub use params::ParamPackage;
pub use poll::{MIN_POLL_INTERVAL, PollGate, SnapshotCache};
pub use state::{Buttons, ControllerState, StickAxis};
