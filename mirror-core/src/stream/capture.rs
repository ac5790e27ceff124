//! Capture/streaming loop run by the dedicated capture thread.
//!
//! Per iteration:
//!
//! 1. Wait (bounded) on the mailbox for the next completed frame.
//! 2. Resize the ring if the frame's backing store was reloaded.
//! 3. Wait on the frame's render fence.
//! 4. Copy the frame into the write slot and fence the copy.
//! 5. Map the read slot (filled one iteration earlier).
//! 6. Send it over the [`RemoteLink`].
//! 7. Unmap and swap slot roles.
//!
//! Resource and transport failures skip the current iteration and the
//! loop carries on. If the ring cannot be allocated for a connection the
//! loop stays in `Connecting` until the remote reconnects or asks for
//! another resolution. Only a stop request ends it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::MirrorError;
use crate::link::RemoteLink;
use crate::stream::StreamConfig;
use crate::stream::gpu::{CurrentContext, GpuBackend};
use crate::stream::layout::FramebufferLayout;
use crate::stream::mailbox::{Frame, FrameMailbox};
use crate::stream::phase::StreamPhase;
use crate::stream::ring::FrameRing;

/// Invoked once per new remote connection with the negotiated layout.
pub type ConnectCallback = Arc<dyn Fn(&FramebufferLayout) + Send + Sync + 'static>;

// ── CaptureStats ─────────────────────────────────────────────────

/// Counters updated by the capture thread.
#[derive(Debug, Default)]
pub struct CaptureStats {
    frames_captured: AtomicU64,
    frames_sent: AtomicU64,
    send_failures: AtomicU64,
    map_failures: AtomicU64,
    skipped: AtomicU64,
    connections: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    /// Frames copied into a staging slot.
    pub frames_captured: u64,
    /// Frames accepted by the link.
    pub frames_sent: u64,
    /// Frames the link refused.
    pub send_failures: u64,
    /// Read slots that could not be mapped.
    pub map_failures: u64,
    /// Iterations that produced nothing to send.
    pub skipped: u64,
    /// Remote connections observed.
    pub connections: u64,
}

impl CaptureStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            map_failures: self.map_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
        }
    }
}

// ── CaptureHandles ───────────────────────────────────────────────

/// State shared between a capture loop and whoever controls it.
#[derive(Clone, Default)]
pub struct CaptureHandles {
    /// Set to request a stop. The loop consumes it and resets it.
    pub stop: Arc<AtomicBool>,
    pub phase: Arc<Mutex<StreamPhase>>,
    pub stats: Arc<CaptureStats>,
    pub callbacks: Arc<Mutex<Vec<ConnectCallback>>>,
}

// ── CaptureLoop ──────────────────────────────────────────────────

/// Drives frames from the mailbox to the remote link.
///
/// The loop does not own the GPU context; [`run`](Self::run) borrows it
/// for the duration of the session so the caller gets it back.
pub struct CaptureLoop {
    link: Arc<dyn RemoteLink>,
    mailbox: Arc<dyn FrameMailbox>,
    config: StreamConfig,
    handles: CaptureHandles,
}

impl CaptureLoop {
    pub fn new(
        link: Arc<dyn RemoteLink>,
        mailbox: Arc<dyn FrameMailbox>,
        config: StreamConfig,
    ) -> Self {
        Self::with_handles(link, mailbox, config, CaptureHandles::default())
    }

    /// Build a loop that reports through existing `handles`.
    pub fn with_handles(
        link: Arc<dyn RemoteLink>,
        mailbox: Arc<dyn FrameMailbox>,
        config: StreamConfig,
        handles: CaptureHandles,
    ) -> Self {
        Self {
            link,
            mailbox,
            config,
            handles,
        }
    }

    pub fn handles(&self) -> &CaptureHandles {
        &self.handles
    }

    /// Run until a stop is requested.
    ///
    /// Leaves the phase at `Idle`, the stop flag cleared and every
    /// staging buffer released.
    pub fn run<G: GpuBackend>(&self, gpu: &mut G) {
        {
            let mut phase = self.handles.phase.lock();
            if phase.is_idle() {
                if let Err(e) = phase.begin_connect() {
                    debug!("capture start: {e}");
                }
            }
        }

        match CurrentContext::acquire(gpu) {
            Ok(mut ctx) => {
                if let Some(ring) = self.session(&mut *ctx) {
                    ring.release(&mut *ctx);
                }
            }
            Err(e) => error!("could not make graphics context current: {e}"),
        }

        self.finish();
    }

    /// Connect/stream cycle. Returns the ring if one was allocated.
    fn session<G: GpuBackend>(&self, gpu: &mut G) -> Option<FrameRing> {
        let mut ring: Option<FrameRing> = None;

        'session: loop {
            if !self.wait_for_connection() {
                break;
            }

            let requested = self.link.requested_resolution();
            let layout = FramebufferLayout::fit(requested, self.config.screen_aspect);
            let prepared = match ring.take() {
                Some(mut r) => match r.ensure_size(gpu, layout.width, layout.height) {
                    Ok(resized) => {
                        if resized {
                            debug!("resized staging buffers to {}x{}", layout.width, layout.height);
                        }
                        Ok(r)
                    }
                    Err(e) => {
                        r.release(gpu);
                        Err(e)
                    }
                },
                None => FrameRing::allocate(gpu, layout.width, layout.height),
            };
            let active = match prepared {
                Ok(r) => ring.insert(r),
                Err(e) => {
                    error!(
                        "cannot allocate staging buffers for {}x{}: {e}",
                        layout.width, layout.height
                    );
                    if !self.wait_for_renegotiation(requested) {
                        break;
                    }
                    continue;
                }
            };

            self.connected(&layout);

            loop {
                if self.handles.stop.swap(false, Ordering::AcqRel) {
                    break 'session;
                }
                if !self.link.is_connected() {
                    info!("remote display disconnected");
                    self.transition(StreamPhase::connection_lost);
                    continue 'session;
                }
                self.iterate(gpu, active, &layout);
            }
        }

        ring
    }

    /// Wait in `Connecting` until the link is up, draining frames so the
    /// producer never blocks. Returns `false` if a stop was requested.
    fn wait_for_connection(&self) -> bool {
        let mut announced = false;
        loop {
            if self.handles.stop.swap(false, Ordering::AcqRel) {
                return false;
            }
            if self.link.is_connected() {
                return true;
            }
            if !announced {
                info!("waiting for remote display to connect");
                announced = true;
            }
            if let Some(frame) = self.mailbox.try_get_ready_frame(self.config.mailbox_timeout) {
                self.mailbox.return_frame(frame, None);
            }
        }
    }

    /// After a failed allocation, wait until the link drops or requests a
    /// different resolution. Returns `false` if a stop was requested.
    fn wait_for_renegotiation(&self, failed: (u32, u32)) -> bool {
        loop {
            if self.handles.stop.swap(false, Ordering::AcqRel) {
                return false;
            }
            if !self.link.is_connected() || self.link.requested_resolution() != failed {
                return true;
            }
            if let Some(frame) = self.mailbox.try_get_ready_frame(self.config.mailbox_timeout) {
                self.skip(frame);
            }
        }
    }

    fn connected(&self, layout: &FramebufferLayout) {
        info!(
            "remote display connected, streaming {}x{}",
            layout.width, layout.height
        );
        CaptureStats::bump(&self.handles.stats.connections);
        self.transition(StreamPhase::begin_streaming);

        // Callbacks run outside the lock so they may register more.
        let callbacks = self.handles.callbacks.lock().clone();
        for callback in &callbacks {
            callback(layout);
        }
        if !callbacks.is_empty() {
            debug!("requested input device reload");
        }
    }

    /// One pass of the double-buffered readback.
    fn iterate<G: GpuBackend>(&self, gpu: &mut G, ring: &mut FrameRing, layout: &FramebufferLayout) {
        let stats = &self.handles.stats;

        let Some(mut frame) = self.mailbox.try_get_ready_frame(self.config.mailbox_timeout) else {
            return;
        };

        if frame.color_reloaded {
            debug!("reloading present frame {}", frame.id);
            self.mailbox
                .notify_frame_reloaded(&mut frame, layout.width, layout.height);
        }
        if let Err(e) = ring.ensure_size(gpu, layout.width, layout.height) {
            warn!("staging buffer resize failed: {e}");
            self.skip(frame);
            return;
        }

        // Render must be complete before the copy is issued.
        gpu.wait_fence(frame.render_fence);

        let target = ring.write_slot().buffer;
        if let Err(e) = gpu.read_pixels(frame.surface, target, layout.width, layout.height) {
            warn!("readback of frame {} failed: {e}", frame.id);
            self.skip(frame);
            return;
        }
        let copy_fence = gpu.insert_fence();
        ring.write_slot_mut().fence = Some(copy_fence);
        self.mailbox.return_frame(frame, Some(copy_fence));
        CaptureStats::bump(&stats.frames_captured);

        if let Err(e) = self.forward_read_slot(gpu, ring, layout) {
            match e {
                MirrorError::BufferMap(_) | MirrorError::UnknownBuffer(_) => {
                    warn!("pixels unavailable: {e}");
                    CaptureStats::bump(&stats.map_failures);
                }
                _ => warn!("frame not forwarded: {e}"),
            }
        }

        ring.swap();
    }

    /// Map the read slot and hand its pixels to the link.
    fn forward_read_slot<G: GpuBackend>(
        &self,
        gpu: &mut G,
        ring: &FrameRing,
        layout: &FramebufferLayout,
    ) -> Result<(), MirrorError> {
        let stats = &self.handles.stats;
        let slot = ring.read_slot();

        // Never written since allocation or resize.
        let Some(fence) = slot.fence else {
            CaptureStats::bump(&stats.skipped);
            return Ok(());
        };
        gpu.wait_fence(fence);

        let buffer = slot.buffer;
        let pixels = gpu.map_for_read(buffer)?;
        let sent = self
            .link
            .send_frame(pixels, layout.width, layout.height, layout.stride());
        gpu.unmap(buffer);

        if sent {
            CaptureStats::bump(&stats.frames_sent);
        } else {
            warn!("send frame failed");
            CaptureStats::bump(&stats.send_failures);
        }
        Ok(())
    }

    fn skip(&self, frame: Frame) {
        CaptureStats::bump(&self.handles.stats.skipped);
        self.mailbox.return_frame(frame, None);
    }

    fn transition(&self, f: fn(&mut StreamPhase) -> Result<(), MirrorError>) {
        let mut phase = self.handles.phase.lock();
        if let Err(e) = f(&mut *phase) {
            debug!("phase {}: {e}", *phase);
        }
    }

    fn finish(&self) {
        {
            let mut phase = self.handles.phase.lock();
            if let Err(e) = phase.begin_stop().and_then(|()| phase.finish_stop()) {
                debug!("stop from unexpected phase: {e}");
                phase.force_idle();
            }
        }
        self.handles.stop.store(false, Ordering::Release);
        info!("capture loop stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────
