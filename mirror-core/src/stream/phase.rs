//! Stream session state machine.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::MirrorError;

/// Lifecycle phase of a forwarding session.
///
/// ```text
///  Idle ──► Connecting ──► Streaming
///   ▲           │  ▲           │
///   │           │  └───────────┤ (link lost)
///   │           ▼              ▼
///   └──────── Stopping ◄───────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// No capture worker. Initial and terminal state.
    #[default]
    Idle,

    /// Worker running, waiting for the remote display to attach.
    Connecting,

    /// Frames are being read back and sent.
    Streaming {
        /// When the current connection started streaming.
        since: Instant,
    },

    /// Worker is releasing its buffers.
    Stopping,
}

impl std::fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Streaming { .. } => write!(f, "Streaming"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}

impl StreamPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    /// How long the session has been streaming, `None` in other phases.
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Idle`.
    pub fn begin_connect(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot connect: not in Idle state",
            )),
        }
    }

    /// Valid from: `Connecting`.
    pub fn begin_streaming(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Connecting => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot stream: not in Connecting state",
            )),
        }
    }

    /// The link dropped mid-session. Valid from: `Streaming`.
    pub fn connection_lost(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Streaming { .. } => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot lose connection: not in Streaming state",
            )),
        }
    }

    /// Valid from: `Connecting`, `Streaming`.
    pub fn begin_stop(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Connecting | Self::Streaming { .. } => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot stop: not in Connecting or Streaming state",
            )),
        }
    }

    /// Valid from: `Stopping`.
    pub fn finish_stop(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Stopping => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTransition(
                "cannot finish stop: not in Stopping state",
            )),
        }
    }

    /// Reset to `Idle` regardless of the current phase.
    pub fn force_idle(&mut self) {
        *self = Self::Idle;
    }
}

// ── Tests ────────────────────────────────────────────────────────
