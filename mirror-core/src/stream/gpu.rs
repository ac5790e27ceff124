//! Minimal GPU capability set needed by the capture loop.
//!
//! The capture loop never talks to a graphics API directly. It drives a
//! [`GpuBackend`], which hides buffer management, fences and readback.
//! Tests and the headless harness use
//! [`SoftwareGpu`](crate::stream::software::SoftwareGpu).

use std::ops::{Deref, DerefMut};

use crate::error::MirrorError;

/// Bytes per pixel of every staging buffer (BGRA8).
pub const BYTES_PER_PIXEL: u32 = 4;

/// Handle of a host-readable staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle of a render target owned by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// Handle of a GPU fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

// ── GpuBackend ───────────────────────────────────────────────────

/// Graphics context used exclusively by the capture thread.
///
/// All methods take `&mut self`: the context is owned by one thread at
/// a time and moves with the capture worker.
pub trait GpuBackend: Send {
    /// Bind the context to the calling thread.
    fn make_current(&mut self) -> Result<(), MirrorError>;

    /// Unbind the context from the calling thread.
    fn done_current(&mut self);

    /// Allocate a staging buffer of `size` bytes.
    fn create_buffer(&mut self, size: usize) -> Result<BufferId, MirrorError>;

    /// Reallocate `buffer` to `size` bytes. Previous contents are lost.
    fn resize_buffer(&mut self, buffer: BufferId, size: usize) -> Result<(), MirrorError>;

    fn release_buffer(&mut self, buffer: BufferId);

    /// Insert a fence after every command issued so far.
    fn insert_fence(&mut self) -> FenceId;

    /// Block until `fence` is signaled.
    fn wait_fence(&mut self, fence: FenceId);

    /// Queue an asynchronous copy of `width x height` pixels from
    /// `surface` into `buffer`.
    fn read_pixels(
        &mut self,
        surface: SurfaceId,
        buffer: BufferId,
        width: u32,
        height: u32,
    ) -> Result<(), MirrorError>;

    /// Map `buffer` for host reading.
    fn map_for_read(&mut self, buffer: BufferId) -> Result<&[u8], MirrorError>;

    fn unmap(&mut self, buffer: BufferId);
}

// ── CurrentContext ───────────────────────────────────────────────

/// Keeps a [`GpuBackend`] current on this thread until dropped.
pub struct CurrentContext<'a, G: GpuBackend> {
    gpu: &'a mut G,
}

impl<'a, G: GpuBackend> CurrentContext<'a, G> {
    pub fn acquire(gpu: &'a mut G) -> Result<Self, MirrorError> {
        gpu.make_current()?;
        Ok(Self { gpu })
    }
}

impl<G: GpuBackend> Deref for CurrentContext<'_, G> {
    type Target = G;

    fn deref(&self) -> &G {
        self.gpu
    }
}

impl<G: GpuBackend> DerefMut for CurrentContext<'_, G> {
    fn deref_mut(&mut self) -> &mut G {
        self.gpu
    }
}

impl<G: GpuBackend> Drop for CurrentContext<'_, G> {
    fn drop(&mut self) {
        self.gpu.done_current();
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::software::{GpuEvent, SoftwareGpu, SurfaceStore};

    #[test]
    fn current_context_is_released_on_drop() {
        let mut gpu = SoftwareGpu::new(SurfaceStore::default());
        let trace = gpu.trace();
        {
            let mut ctx = CurrentContext::acquire(&mut gpu).unwrap();
            ctx.insert_fence();
        }
        let events = trace.events();
        assert_eq!(events.first(), Some(&GpuEvent::MakeCurrent));
        assert_eq!(events.last(), Some(&GpuEvent::DoneCurrent));
    }
}
