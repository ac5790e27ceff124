//! # mirror-host: headless mirroring host
//!
//! Drives the `mirror-core` pipeline without an emulator or a network.
//! A synthetic renderer stands in for the present thread, a
//! `LoopbackLink` stands in for the remote display, and a software GPU
//! performs the readback.
//!
//! ## Modules
//!
//! - **config**: TOML configuration with per-section defaults.
//! - **harness**: Wires renderer, controller, link and input devices
//!   together and runs them until shutdown.

pub mod config;
pub mod harness;
