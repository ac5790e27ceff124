//! In-memory [`GpuBackend`] for the headless harness and tests.
//!
//! Commands execute synchronously, so every fence is signaled as soon
//! as it is inserted. Each call is appended to a shared [`GpuTrace`],
//! and tests read the trace to check ordering. Render surfaces live in a
//! [`SurfaceStore`] shared with whoever plays the render thread.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::MirrorError;
use crate::stream::gpu::{BYTES_PER_PIXEL, BufferId, FenceId, GpuBackend, SurfaceId};

// ── SurfaceStore ─────────────────────────────────────────────────

/// A BGRA8 render target.
#[derive(Debug, Clone)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Surface {
    /// A surface filled with one BGRA colour.
    pub fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let pixels = bgra
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Render targets shared between the producer and the [`SoftwareGpu`].
#[derive(Debug, Clone, Default)]
pub struct SurfaceStore {
    surfaces: Arc<RwLock<HashMap<SurfaceId, Surface>>>,
}

impl SurfaceStore {
    pub fn insert(&self, id: SurfaceId, surface: Surface) {
        self.surfaces.write().insert(id, surface);
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.read().contains_key(&id)
    }

    /// Run `f` against the surface `id`, if it exists.
    pub fn with<R>(&self, id: SurfaceId, f: impl FnOnce(&Surface) -> R) -> Option<R> {
        self.surfaces.read().get(&id).map(f)
    }
}

// ── GpuTrace ─────────────────────────────────────────────────────

/// One command observed by a [`SoftwareGpu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuEvent {
    MakeCurrent,
    DoneCurrent,
    CreateBuffer { buffer: BufferId, size: usize },
    ResizeBuffer { buffer: BufferId, size: usize },
    ReleaseBuffer(BufferId),
    InsertFence(FenceId),
    WaitFence(FenceId),
    ReadPixels { surface: SurfaceId, buffer: BufferId },
    Map(BufferId),
    MapFailed(BufferId),
    Unmap(BufferId),
}

/// Shared, append-only log of [`GpuEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct GpuTrace {
    events: Arc<Mutex<Vec<GpuEvent>>>,
}

impl GpuTrace {
    fn push(&self, event: GpuEvent) {
        self.events.lock().push(event);
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<GpuEvent> {
        self.events.lock().clone()
    }

    /// Buffers created and not yet released.
    pub fn live_buffers(&self) -> usize {
        let events = self.events.lock();
        let created = events
            .iter()
            .filter(|e| matches!(e, GpuEvent::CreateBuffer { .. }))
            .count();
        let released = events
            .iter()
            .filter(|e| matches!(e, GpuEvent::ReleaseBuffer(_)))
            .count();
        created.saturating_sub(released)
    }

    pub fn count(&self, pred: impl Fn(&GpuEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

// ── SoftwareGpu ──────────────────────────────────────────────────

/// A [`GpuBackend`] whose buffers are plain `Vec<u8>`s.
pub struct SoftwareGpu {
    surfaces: SurfaceStore,
    buffers: HashMap<BufferId, Vec<u8>>,
    next_buffer: u32,
    next_fence: u64,
    /// Number of upcoming `map_for_read` calls that should fail.
    failing_maps: usize,
    trace: GpuTrace,
    recording: bool,
}

impl SoftwareGpu {
    pub fn new(surfaces: SurfaceStore) -> Self {
        Self {
            surfaces,
            buffers: HashMap::new(),
            next_buffer: 1,
            next_fence: 1,
            failing_maps: 0,
            trace: GpuTrace::default(),
            recording: true,
        }
    }

    /// Stop appending to the trace. Long-running hosts use this so the
    /// log does not grow without bound.
    pub fn untraced(mut self) -> Self {
        self.recording = false;
        self
    }

    /// Make the next `count` maps fail as if the driver were out of
    /// memory.
    pub fn with_map_failures(mut self, count: usize) -> Self {
        self.failing_maps = count;
        self
    }

    /// Handle on the command log.
    pub fn trace(&self) -> GpuTrace {
        self.trace.clone()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn record(&self, event: GpuEvent) {
        if self.recording {
            self.trace.push(event);
        }
    }

    fn buffer_mut(&mut self, buffer: BufferId) -> Result<&mut Vec<u8>, MirrorError> {
        self.buffers
            .get_mut(&buffer)
            .ok_or(MirrorError::UnknownBuffer(buffer.0))
    }
}

impl GpuBackend for SoftwareGpu {
    fn make_current(&mut self) -> Result<(), MirrorError> {
        self.record(GpuEvent::MakeCurrent);
        Ok(())
    }

    fn done_current(&mut self) {
        self.record(GpuEvent::DoneCurrent);
    }

    fn create_buffer(&mut self, size: usize) -> Result<BufferId, MirrorError> {
        if size == 0 {
            return Err(MirrorError::BufferAlloc { size });
        }
        let buffer = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(buffer, vec![0; size]);
        self.record(GpuEvent::CreateBuffer { buffer, size });
        Ok(buffer)
    }

    fn resize_buffer(&mut self, buffer: BufferId, size: usize) -> Result<(), MirrorError> {
        if size == 0 {
            return Err(MirrorError::BufferAlloc { size });
        }
        let data = self.buffer_mut(buffer)?;
        *data = vec![0; size];
        self.record(GpuEvent::ResizeBuffer { buffer, size });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.record(GpuEvent::ReleaseBuffer(buffer));
        }
    }

    fn insert_fence(&mut self) -> FenceId {
        let fence = FenceId(self.next_fence);
        self.next_fence += 1;
        self.record(GpuEvent::InsertFence(fence));
        fence
    }

    fn wait_fence(&mut self, fence: FenceId) {
        self.record(GpuEvent::WaitFence(fence));
    }

    fn read_pixels(
        &mut self,
        surface: SurfaceId,
        buffer: BufferId,
        width: u32,
        height: u32,
    ) -> Result<(), MirrorError> {
        let row_bytes = width as usize * BYTES_PER_PIXEL as usize;
        let rows = height as usize;

        // Rows are copied as far as both the surface and the buffer allow.
        let surfaces = self.surfaces.clone();
        let data = self.buffer_mut(buffer)?;
        surfaces
            .with(surface, |src| {
                let src_row = src.width as usize * BYTES_PER_PIXEL as usize;
                let copy = row_bytes.min(src_row);
                for y in 0..rows.min(src.height as usize) {
                    let s = &src.pixels[y * src_row..y * src_row + copy];
                    let d_start = y * row_bytes;
                    if d_start + copy > data.len() {
                        break;
                    }
                    data[d_start..d_start + copy].copy_from_slice(s);
                }
            })
            .ok_or(MirrorError::UnknownSurface(surface.0))?;

        self.record(GpuEvent::ReadPixels { surface, buffer });
        Ok(())
    }

    fn map_for_read(&mut self, buffer: BufferId) -> Result<&[u8], MirrorError> {
        if self.failing_maps > 0 {
            self.failing_maps -= 1;
            self.record(GpuEvent::MapFailed(buffer));
            return Err(MirrorError::BufferMap("out of memory"));
        }
        if !self.buffers.contains_key(&buffer) {
            return Err(MirrorError::UnknownBuffer(buffer.0));
        }
        self.record(GpuEvent::Map(buffer));
        self.buffers
            .get(&buffer)
            .map(Vec::as_slice)
            .ok_or(MirrorError::UnknownBuffer(buffer.0))
    }

    fn unmap(&mut self, buffer: BufferId) {
        self.record(GpuEvent::Unmap(buffer));
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_copies_surface_pixels() {
        let store = SurfaceStore::default();
        store.insert(SurfaceId(1), Surface::solid(2, 2, [1, 2, 3, 4]));
        let mut gpu = SoftwareGpu::new(store);

        let buf = gpu.create_buffer(16).unwrap();
        gpu.read_pixels(SurfaceId(1), buf, 2, 2).unwrap();
        let pixels = gpu.map_for_read(buf).unwrap();
        assert_eq!(&pixels[..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
        gpu.unmap(buf);
    }

    #[test]
    fn readback_clips_to_smaller_surface() {
        let store = SurfaceStore::default();
        store.insert(SurfaceId(1), Surface::solid(1, 1, [9, 9, 9, 9]));
        let mut gpu = SoftwareGpu::new(store);

        let buf = gpu.create_buffer(16).unwrap();
        gpu.read_pixels(SurfaceId(1), buf, 2, 2).unwrap();
        let pixels = gpu.map_for_read(buf).unwrap();
        assert_eq!(&pixels[..8], &[9, 9, 9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn unknown_surface_is_an_error() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default());
        let buf = gpu.create_buffer(4).unwrap();
        assert!(matches!(
            gpu.read_pixels(SurfaceId(7), buf, 1, 1),
            Err(MirrorError::UnknownSurface(7))
        ));
    }

    #[test]
    fn injected_map_failures() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default()).with_map_failures(1);
        let buf = gpu.create_buffer(4).unwrap();
        assert!(gpu.map_for_read(buf).is_err());
        assert!(gpu.map_for_read(buf).is_ok());
    }

    #[test]
    fn zero_sized_buffers_are_rejected() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default());
        assert!(matches!(
            gpu.create_buffer(0),
            Err(MirrorError::BufferAlloc { size: 0 })
        ));
    }

    #[test]
    fn trace_tracks_live_buffers() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default());
        let trace = gpu.trace();
        let a = gpu.create_buffer(4).unwrap();
        let _b = gpu.create_buffer(4).unwrap();
        assert_eq!(trace.live_buffers(), 2);
        gpu.release_buffer(a);
        gpu.release_buffer(a);
        assert_eq!(trace.live_buffers(), 1);
        assert_eq!(gpu.buffer_count(), 1);
    }

    #[test]
    fn untraced_gpu_records_nothing() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default()).untraced();
        let trace = gpu.trace();
        let buf = gpu.create_buffer(4).unwrap();
        gpu.insert_fence();
        gpu.release_buffer(buf);
        assert!(trace.events().is_empty());
        assert_eq!(gpu.buffer_count(), 0);
    }

    #[test]
    fn fences_are_monotonic() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default());
        let f1 = gpu.insert_fence();
        let f2 = gpu.insert_fence();
        assert!(f2 > f1);
    }
}
