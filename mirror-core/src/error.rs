//! Domain-specific error types for the mirroring pipeline.
//!
//! Only resource and lifecycle operations are fallible. Connectivity
//! problems never surface here; input queries degrade to neutral values
//! instead.

use thiserror::Error;

/// The canonical error type for `mirror-core`.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── GPU Resource Errors ──────────────────────────────────────
    /// A staging buffer could not be allocated or resized.
    #[error("buffer allocation failed: {size} bytes")]
    BufferAlloc { size: usize },

    /// A staging buffer could not be mapped for host reading.
    #[error("buffer map failed: {0}")]
    BufferMap(&'static str),

    /// A buffer handle did not refer to a live buffer.
    #[error("unknown buffer handle: {0}")]
    UnknownBuffer(u32),

    /// A frame referenced a surface the backend does not know about.
    #[error("unknown surface handle: {0}")]
    UnknownSurface(u32),

    // ── Worker Errors ────────────────────────────────────────────
    /// The GPU context was lost together with a panicked capture worker.
    #[error("graphics context lost with the previous capture worker")]
    ContextLost,

    /// The capture thread could not be spawned.
    #[error("failed to spawn capture worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    // ── State Errors ─────────────────────────────────────────────
    /// A stream phase transition was not valid from the current phase.
    #[error("invalid stream transition: {0}")]
    InvalidTransition(&'static str),

    // ── Configuration Errors ─────────────────────────────────────
    /// A device parameter string could not be parsed.
    #[error("invalid device parameter: {0}")]
    InvalidParam(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for MirrorError {
    fn from(s: String) -> Self {
        MirrorError::Other(s)
    }
}

impl From<&str> for MirrorError {
    fn from(s: &str) -> Self {
        MirrorError::Other(s.to_string())
    }
}
