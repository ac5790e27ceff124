//! Two staging buffers that pipeline GPU-to-host readback.
//!
//! Each iteration the GPU copies the new frame into the *write* slot
//! while the host maps the *read* slot, which was written one iteration
//! earlier. The host never waits on a copy issued in the same
//! iteration, and what it sends is at most one frame stale.

use crate::error::MirrorError;
use crate::stream::gpu::{BYTES_PER_PIXEL, BufferId, FenceId, GpuBackend};

/// One staging buffer and the fence that marks its last copy complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSlot {
    pub buffer: BufferId,
    pub size: usize,
    /// `None` until a copy has been issued into this slot.
    pub fence: Option<FenceId>,
}

/// Double-buffered ring of [`FrameSlot`]s.
#[derive(Debug)]
pub struct FrameRing {
    slots: [FrameSlot; 2],
    /// Index of the slot written this iteration. The other one is read.
    current: usize,
    swaps: u64,
}

/// Bytes needed for one `width x height` BGRA8 frame.
pub fn frame_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL as usize
}

impl FrameRing {
    /// Allocate both slots for `width x height` frames.
    pub fn allocate<G: GpuBackend>(
        gpu: &mut G,
        width: u32,
        height: u32,
    ) -> Result<Self, MirrorError> {
        let size = frame_size(width, height);
        let first = gpu.create_buffer(size)?;
        let second = match gpu.create_buffer(size) {
            Ok(b) => b,
            Err(e) => {
                gpu.release_buffer(first);
                return Err(e);
            }
        };

        let slot = |buffer| FrameSlot {
            buffer,
            size,
            fence: None,
        };
        Ok(Self {
            slots: [slot(first), slot(second)],
            current: 1,
            swaps: 0,
        })
    }

    /// Resize both slots if the frame size changed.
    ///
    /// Returns `true` when a resize happened. Resized slots lose their
    /// fences because their contents are gone.
    pub fn ensure_size<G: GpuBackend>(
        &mut self,
        gpu: &mut G,
        width: u32,
        height: u32,
    ) -> Result<bool, MirrorError> {
        let size = frame_size(width, height);
        if self.slots.iter().all(|s| s.size == size) {
            return Ok(false);
        }
        for slot in &mut self.slots {
            // Whatever happens next, the old contents are unusable.
            slot.fence = None;
            gpu.resize_buffer(slot.buffer, size)?;
            slot.size = size;
        }
        Ok(true)
    }

    /// Slot the GPU copies into this iteration.
    pub fn write_slot(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    pub fn write_slot_mut(&mut self) -> &mut FrameSlot {
        &mut self.slots[self.current]
    }

    /// Slot the host reads this iteration.
    pub fn read_slot(&self) -> &FrameSlot {
        &self.slots[self.next()]
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn next(&self) -> usize {
        (self.current + 1) % 2
    }

    /// Exchange the write and read roles.
    pub fn swap(&mut self) {
        self.current = self.next();
        self.swaps += 1;
    }

    /// Completed role swaps since allocation.
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Give both buffers back to the GPU.
    pub fn release<G: GpuBackend>(self, gpu: &mut G) {
        for slot in self.slots {
            gpu.release_buffer(slot.buffer);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::software::{SoftwareGpu, SurfaceStore};

    fn gpu() -> SoftwareGpu {
        SoftwareGpu::new(SurfaceStore::default())
    }

    #[test]
    fn allocates_two_distinct_slots() {
        let mut gpu = gpu();
        let ring = FrameRing::allocate(&mut gpu, 4, 2).unwrap();
        assert_ne!(ring.write_slot().buffer, ring.read_slot().buffer);
        assert_eq!(ring.write_slot().size, 32);
        assert!(ring.write_slot().fence.is_none());
        assert_eq!(gpu.buffer_count(), 2);
    }

    #[test]
    fn roles_alternate() {
        let mut gpu = gpu();
        let mut ring = FrameRing::allocate(&mut gpu, 1, 1).unwrap();
        let first_write = ring.write_slot().buffer;
        let first_read = ring.read_slot().buffer;

        ring.swap();
        assert_eq!(ring.write_slot().buffer, first_read);
        assert_eq!(ring.read_slot().buffer, first_write);

        ring.swap();
        assert_eq!(ring.write_slot().buffer, first_write);
        assert_eq!(ring.swaps(), 2);
        assert_ne!(ring.current(), ring.next());
    }

    #[test]
    fn ensure_size_resizes_and_clears_fences() {
        let mut gpu = gpu();
        let mut ring = FrameRing::allocate(&mut gpu, 2, 2).unwrap();
        ring.write_slot_mut().fence = Some(FenceId(1));

        assert!(!ring.ensure_size(&mut gpu, 2, 2).unwrap());
        assert!(ring.write_slot().fence.is_some());

        assert!(ring.ensure_size(&mut gpu, 4, 4).unwrap());
        assert_eq!(ring.write_slot().size, 64);
        assert_eq!(ring.read_slot().size, 64);
        assert!(ring.write_slot().fence.is_none());
    }

    #[test]
    fn failed_allocation_leaks_nothing() {
        let mut gpu = gpu();
        assert!(FrameRing::allocate(&mut gpu, 0, 0).is_err());
        assert_eq!(gpu.buffer_count(), 0);
    }

    #[test]
    fn release_frees_both_buffers() {
        let mut gpu = gpu();
        let ring = FrameRing::allocate(&mut gpu, 1, 1).unwrap();
        ring.release(&mut gpu);
        assert_eq!(gpu.buffer_count(), 0);
    }
}
