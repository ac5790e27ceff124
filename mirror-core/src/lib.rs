//! # mirror-core
//!
//! Second-screen mirroring for an emulator host.
//!
//! This crate contains:
//! - **Stream**: `StreamController` and the double-buffered `CaptureLoop`
//!   that reads rendered frames back from the GPU and forwards them to a
//!   remote display
//! - **Input**: `InputDecoder` and the remote button, analog and touch
//!   devices fed by the controller snapshot the remote display sends back
//! - **Link**: `RemoteLink`, the seam to the transport, plus `LoopbackLink`
//! - **Error**: `MirrorError`, a typed `thiserror`-based error enum

pub mod error;
pub mod input;
pub mod link;
pub mod stream;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::MirrorError;
pub use input::{
    Buttons, ControllerState, InputDecoder, NativeAnalog, NativeButton, ParamPackage, TouchPoint,
};
pub use link::{LoopbackLink, RemoteLink, SentFrame};
pub use stream::{
    CaptureStatsSnapshot, FramebufferLayout, GpuBackend, LatestFrameMailbox, SoftwareGpu,
    StreamConfig, StreamController, StreamPhase,
};
