//! Frames in flight: synchronization primitives, the frame ring, and the
//! blocking immediate-submit path.
//!
//! A frame slot cycles Idle -> Recording -> InFlight and back. The CPU may
//! only reuse a slot after its fence has signaled, and the fence is reset
//! only once the next swapchain image is in hand, so a frame aborted by a
//! stale swapchain leaves the fence signaled and the slot reusable.

use ash::vk;

use crate::command::{CommandEncoder, CommandPool};
use crate::device::RenderDevice;
use crate::error::RhiError;

/// Number of frames the CPU may record ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Binary semaphore.
pub struct Semaphore {
    device: ash::Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(name: &str, device: &RenderDevice) -> Result<Self, RhiError> {
        let semaphore = unsafe {
            device
                .handle()
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?
        };
        device.set_object_name(semaphore, name);

        Ok(Self {
            device: device.handle().clone(),
            semaphore,
        })
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence for CPU-side waits on submitted work.
pub struct Fence {
    device: ash::Device,
    fence: vk::Fence,
}

impl Fence {
    pub fn new(name: &str, device: &RenderDevice, signaled: bool) -> Result<Self, RhiError> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe {
            device
                .handle()
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)?
        };
        device.set_object_name(fence, name);

        Ok(Self {
            device: device.handle().clone(),
            fence,
        })
    }

    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Block until the fence signals. Returns immediately if it already has.
    pub fn wait(&self) -> Result<(), RhiError> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, u64::MAX)?;
        }
        Ok(())
    }

    pub fn reset(&self) -> Result<(), RhiError> {
        unsafe { self.device.reset_fences(&[self.fence])? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Lifecycle of one frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Recording,
    InFlight,
}

/// Host-side bookkeeping for frame slots.
///
/// Holds no Vulkan objects; [`FramePool`] drives it with real fences and
/// tests drive it directly. The frame counter only advances on `advance`,
/// so an aborted frame retries the same slot.
#[derive(Debug)]
pub struct FrameRing {
    counter: u64,
    slots: Vec<SlotState>,
}

impl FrameRing {
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "frame pool must have at least one slot");
        Self {
            counter: 0,
            slots: vec![SlotState::Idle; pool_size],
        }
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    /// Frames completed since creation.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots[slot]
    }

    /// Pick the slot for the current frame and report whether its previous
    /// submission may still be executing. The slot is considered retired
    /// afterwards; the caller is responsible for the actual fence wait.
    pub fn acquire(&mut self) -> (usize, bool) {
        let slot = (self.counter % self.slots.len() as u64) as usize;
        let must_wait = self.slots[slot] == SlotState::InFlight;
        self.slots[slot] = SlotState::Idle;
        (slot, must_wait)
    }

    pub fn begin_recording(&mut self, slot: usize) {
        debug_assert_eq!(
            self.slots[slot],
            SlotState::Idle,
            "frame slot {slot} began recording while not idle"
        );
        self.slots[slot] = SlotState::Recording;
    }

    pub fn submit(&mut self, slot: usize) {
        debug_assert_eq!(
            self.slots[slot],
            SlotState::Recording,
            "frame slot {slot} submitted without recording"
        );
        self.slots[slot] = SlotState::InFlight;
    }

    /// Move on to the next frame.
    pub fn advance(&mut self) {
        self.counter += 1;
    }
}

/// GPU objects for one frame in flight.
pub struct Frame {
    pool: CommandPool,
    acquire_semaphore: Semaphore,
    render_semaphore: Semaphore,
    fence: Fence,
}

impl Frame {
    fn new(device: &RenderDevice, index: usize) -> Result<Self, RhiError> {
        let pool = CommandPool::new(
            &format!("command_pool.frame{index}"),
            device,
            device.graphics_queue().family_index(),
            vk::CommandPoolCreateFlags::empty(),
        )?;
        let acquire_semaphore = Semaphore::new(&format!("semaphore.acquire.frame{index}"), device)?;
        let render_semaphore = Semaphore::new(&format!("semaphore.render.frame{index}"), device)?;
        // Signaled so the first wait on this slot passes immediately
        let fence = Fence::new(&format!("fence.frame{index}"), device, true)?;

        Ok(Self {
            pool,
            acquire_semaphore,
            render_semaphore,
            fence,
        })
    }

    /// Signaled by the presentation engine when the frame's swapchain image
    /// is ready to be written.
    pub fn acquire_semaphore(&self) -> vk::Semaphore {
        self.acquire_semaphore.handle()
    }

    /// Signaled by the frame's submission; present waits on it.
    pub fn render_semaphore(&self) -> vk::Semaphore {
        self.render_semaphore.handle()
    }

    pub fn fence(&self) -> &Fence {
        &self.fence
    }
}

/// Fixed set of frames cycled round-robin by the frame counter.
pub struct FramePool {
    frames: Vec<Frame>,
    ring: FrameRing,
}

impl FramePool {
    pub fn new(device: &RenderDevice, pool_size: usize) -> Result<Self, RhiError> {
        let frames = (0..pool_size)
            .map(|index| Frame::new(device, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            frames,
            ring: FrameRing::new(pool_size),
        })
    }

    /// Pick the slot for this frame and block until its previous submission
    /// has retired. Waiting on an already-signaled fence returns at once, so
    /// this is unconditional.
    #[profiling::function]
    pub fn wait_next(&mut self) -> Result<usize, RhiError> {
        let (slot, _must_wait) = self.ring.acquire();
        self.frames[slot].fence.wait()?;
        Ok(slot)
    }

    /// Reset the slot's fence and command pool and start recording.
    ///
    /// Call only once this frame's swapchain image is acquired; an earlier
    /// reset would leave the fence unsignaled if the acquire fails and the
    /// frame aborts.
    pub fn begin_recording<'a>(
        &mut self,
        device: &'a RenderDevice,
        slot: usize,
    ) -> Result<CommandEncoder<'a>, RhiError> {
        self.ring.begin_recording(slot);

        let frame = &self.frames[slot];
        frame.fence.reset()?;
        frame.pool.reset()?;

        let encoder = CommandEncoder::new("cmd.frame", device, &frame.pool)?;
        encoder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        Ok(encoder)
    }

    /// End recording and submit: wait the acquire semaphore at color output,
    /// signal the render semaphore and the slot's fence.
    pub fn submit(
        &mut self,
        device: &RenderDevice,
        slot: usize,
        encoder: &CommandEncoder,
    ) -> Result<(), RhiError> {
        encoder.end()?;

        let frame = &self.frames[slot];
        device.submit_commands(
            encoder.handle(),
            &[(
                frame.acquire_semaphore.handle(),
                vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            )],
            &[(
                frame.render_semaphore.handle(),
                vk::PipelineStageFlags2::ALL_GRAPHICS,
            )],
            frame.fence.handle(),
        )?;

        self.ring.submit(slot);
        Ok(())
    }

    /// Advance the frame counter. The next frame takes the following slot.
    pub fn end_frame(&mut self) {
        self.ring.advance();
    }

    pub fn frame(&self, slot: usize) -> &Frame {
        &self.frames[slot]
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_counter(&self) -> u64 {
        self.ring.counter()
    }
}

/// One-off blocking submissions outside the frame loop, for uploads and
/// other work that must finish before rendering continues.
///
/// Single slot: a second `submit_and_wait` reuses the pool and fence only
/// after the first has fully retired.
pub struct ImmediateContext {
    pool: CommandPool,
    fence: Fence,
}

impl ImmediateContext {
    pub fn new(device: &RenderDevice) -> Result<Self, RhiError> {
        let pool = CommandPool::new(
            "command_pool.immediate",
            device,
            device.graphics_queue().family_index(),
            vk::CommandPoolCreateFlags::empty(),
        )?;
        let fence = Fence::new("fence.immediate", device, false)?;

        Ok(Self { pool, fence })
    }

    /// Record commands and submit immediately, blocking until the GPU
    /// finishes.
    #[profiling::function]
    pub fn submit_and_wait<F>(&self, device: &RenderDevice, record: F) -> Result<(), RhiError>
    where
        F: FnOnce(&CommandEncoder),
    {
        self.pool.reset()?;

        let encoder = CommandEncoder::new("cmd.immediate", device, &self.pool)?;
        encoder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&encoder);

        encoder.end()?;
        device.submit_commands(encoder.handle(), &[], &[], self.fence.handle())?;

        self.fence.wait()?;
        self.fence.reset()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
