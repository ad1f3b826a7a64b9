//! Explicit-API device: native handles, the graphics queue and the submission timeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk::{self, Handle};
use tracing::debug;

use crate::image::{Image, ImageCreateInfo};
use crate::timeline::{CompletionMode, GpuTimeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceQueue {
    pub queue_handle: vk::Queue,
    pub queue_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceQueues {
    pub graphics: DeviceQueue,
}

/// Native handles of a device created outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceHandles {
    pub instance: vk::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: vk::Device,
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
}

/// Raw handle values handed out by [`GpuDevice::new`] start here so that they are never null.
const SYNTHETIC_HANDLE_BASE: u64 = 0x1000;

#[derive(Debug)]
pub struct GpuDevice {
    instance: vk::Instance,
    adapter: vk::PhysicalDevice,
    handle: vk::Device,
    queues: DeviceQueues,
    timeline: GpuTimeline,
    next_handle: AtomicU64,
}

impl GpuDevice {
    /// Device with synthetic, unique, non-null handles.
    ///
    /// The handles identify objects; nothing dereferences them.
    pub fn new(completion: CompletionMode) -> Self {
        let next_handle = AtomicU64::new(SYNTHETIC_HANDLE_BASE);
        let alloc = || next_handle.fetch_add(1, Ordering::Relaxed);
        let handles = RawDeviceHandles {
            instance: vk::Instance::from_raw(alloc()),
            physical_device: vk::PhysicalDevice::from_raw(alloc()),
            device: vk::Device::from_raw(alloc()),
            graphics_queue: vk::Queue::from_raw(alloc()),
            graphics_queue_family: 0,
        };
        Self::with_handles(handles, completion, next_handle)
    }

    /// Wrap handles of an existing device. Images created through this device still get
    /// synthetic handles.
    pub fn from_raw_handles(handles: RawDeviceHandles, completion: CompletionMode) -> Self {
        Self::with_handles(
            handles,
            completion,
            AtomicU64::new(SYNTHETIC_HANDLE_BASE),
        )
    }

    fn with_handles(
        handles: RawDeviceHandles,
        completion: CompletionMode,
        next_handle: AtomicU64,
    ) -> Self {
        debug!(
            device = handles.device.as_raw(),
            queue_family = handles.graphics_queue_family,
            ?completion,
            "dxvr-d3d9 created gpu device"
        );
        Self {
            instance: handles.instance,
            adapter: handles.physical_device,
            handle: handles.device,
            queues: DeviceQueues {
                graphics: DeviceQueue {
                    queue_handle: handles.graphics_queue,
                    queue_index: handles.graphics_queue_family,
                },
            },
            timeline: GpuTimeline::new(completion),
            next_handle,
        }
    }

    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    pub fn adapter(&self) -> vk::PhysicalDevice {
        self.adapter
    }

    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    pub fn queues(&self) -> &DeviceQueues {
        &self.queues
    }

    pub fn timeline(&self) -> &GpuTimeline {
        &self.timeline
    }

    pub fn create_image(&self, info: ImageCreateInfo) -> Arc<Image> {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let image = Arc::new(Image::new(vk::Image::from_raw(raw), info));
        debug!(
            image = raw,
            width = info.extent.width,
            height = info.extent.height,
            samples = info.sample_count.as_raw(),
            "created image"
        );
        image
    }

    /// Block until no submitted work is outstanding on any queue.
    pub fn wait_for_idle(&self) {
        self.timeline.wait_idle();
    }
}
