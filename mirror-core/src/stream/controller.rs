//! Host-facing lifecycle wrapper around the capture loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::MirrorError;
use crate::link::RemoteLink;
use crate::stream::StreamConfig;
use crate::stream::capture::{CaptureHandles, CaptureLoop, CaptureStatsSnapshot};
use crate::stream::gpu::GpuBackend;
use crate::stream::layout::FramebufferLayout;
use crate::stream::mailbox::FrameMailbox;
use crate::stream::phase::StreamPhase;

/// Name of the capture thread.
pub const CAPTURE_THREAD_NAME: &str = "mirror-capture";

// ── StreamController ─────────────────────────────────────────────

/// Starts, stops and observes frame forwarding to a remote display.
///
/// The GPU context is parked in the controller between sessions and
/// lent to the capture thread while one runs. At most one capture
/// thread exists at a time.
///
/// Dropping the controller stops and joins the worker.
pub struct StreamController<G: GpuBackend + 'static> {
    link: Arc<dyn RemoteLink>,
    mailbox: Arc<dyn FrameMailbox>,
    config: StreamConfig,
    handles: CaptureHandles,
    /// Parked context. Empty while a worker holds it.
    gpu: Arc<Mutex<Option<G>>>,
    worker: Option<JoinHandle<()>>,
}

impl<G: GpuBackend + 'static> StreamController<G> {
    /// Controller with the default [`StreamConfig`].
    pub fn new(gpu: G, link: Arc<dyn RemoteLink>, mailbox: Arc<dyn FrameMailbox>) -> Self {
        Self::with_config(gpu, link, mailbox, StreamConfig::default())
    }

    pub fn with_config(
        gpu: G,
        link: Arc<dyn RemoteLink>,
        mailbox: Arc<dyn FrameMailbox>,
        config: StreamConfig,
    ) -> Self {
        Self {
            link,
            mailbox,
            config,
            handles: CaptureHandles::default(),
            gpu: Arc::new(Mutex::new(Some(gpu))),
            worker: None,
        }
    }

    /// Whether a remote display is attached.
    pub fn is_streaming(&self) -> bool {
        self.link.is_connected()
    }

    /// Spawn the capture thread.
    ///
    /// A previous worker is asked to stop and joined first. That wait is
    /// bounded by one mailbox timeout.
    pub fn start_forwarding(&mut self) -> Result<(), MirrorError> {
        if self.worker.is_some() {
            self.stop_forwarding();
            self.join()?;
        }
        if self.gpu.lock().is_none() {
            return Err(MirrorError::ContextLost);
        }

        self.handles.stop.store(false, Ordering::Release);
        {
            let mut phase = self.handles.phase.lock();
            phase.force_idle();
            phase.begin_connect()?;
        }

        let capture = CaptureLoop::with_handles(
            Arc::clone(&self.link),
            Arc::clone(&self.mailbox),
            self.config.clone(),
            self.handles.clone(),
        );
        let slot = Arc::clone(&self.gpu);

        let spawned = thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.into())
            .spawn(move || {
                let Some(mut gpu) = slot.lock().take() else {
                    warn!("capture worker started without a graphics context");
                    return;
                };
                capture.run(&mut gpu);
                *slot.lock() = Some(gpu);
            });

        match spawned {
            Ok(handle) => {
                info!("frame forwarding started");
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.handles.phase.lock().force_idle();
                Err(MirrorError::WorkerSpawn(e))
            }
        }
    }

    /// Ask the capture thread to stop. Does not wait for it.
    pub fn stop_forwarding(&self) {
        self.handles.stop.store(true, Ordering::Release);
    }

    /// Block until the capture thread has exited.
    ///
    /// Fails with [`MirrorError::ContextLost`] if the worker panicked.
    pub fn join(&mut self) -> Result<(), MirrorError> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let joined = handle.join();
        // A panicked worker never reached its own cleanup.
        self.handles.phase.lock().force_idle();
        self.handles.stop.store(false, Ordering::Release);
        joined.map_err(|_| {
            warn!("capture worker panicked");
            MirrorError::ContextLost
        })
    }

    /// Whether a capture thread exists and has not exited.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Layout for the resolution the remote display asked for.
    pub fn negotiate_layout(&self) -> FramebufferLayout {
        FramebufferLayout::negotiate(self.link.as_ref(), self.config.screen_aspect)
    }

    /// Register the host's input-device reload hook.
    ///
    /// Fired on the capture thread once per new connection, after the
    /// layout has been negotiated.
    pub fn on_connected<F>(&self, f: F)
    where
        F: Fn(&FramebufferLayout) + Send + Sync + 'static,
    {
        self.handles.callbacks.lock().push(Arc::new(f));
    }

    pub fn phase(&self) -> StreamPhase {
        self.handles.phase.lock().clone()
    }

    pub fn stats(&self) -> CaptureStatsSnapshot {
        self.handles.stats.snapshot()
    }

    /// A cloneable handle that can be used to stop forwarding from
    /// another thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.handles.stop)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl<G: GpuBackend + 'static> Drop for StreamController<G> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop_forwarding();
            if let Err(e) = self.join() {
                warn!("capture worker ended badly: {e}");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
