use std::sync::Mutex;

use ash::vk;

use crate::timeline::GpuTimeline;
use crate::lock_unpoisoned;

#[derive(Debug, Clone, Copy)]
pub struct ImageCreateInfo {
    pub extent: vk::Extent3D,
    pub format: vk::Format,
    pub aspect: vk::ImageAspectFlags,
    pub sample_count: vk::SampleCountFlags,
    pub mip_levels: u32,
    pub num_layers: u32,
    pub usage: vk::ImageUsageFlags,
    /// Layout the image is created in.
    pub layout: vk::ImageLayout,
}

/// How a command touches an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug)]
struct ImageState {
    layout: vk::ImageLayout,
    last_read: u64,
    last_write: u64,
}

/// A GPU-resident 2D image owned by a [`crate::GpuDevice`].
#[derive(Debug)]
pub struct Image {
    handle: vk::Image,
    info: ImageCreateInfo,
    state: Mutex<ImageState>,
}

impl Image {
    pub(crate) fn new(handle: vk::Image, info: ImageCreateInfo) -> Self {
        Self {
            handle,
            info,
            state: Mutex::new(ImageState {
                layout: info.layout,
                last_read: 0,
                last_write: 0,
            }),
        }
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    pub fn info(&self) -> &ImageCreateInfo {
        &self.info
    }

    /// Layout as tracked at record time: the layout the next recorded command will see.
    pub fn layout(&self) -> vk::ImageLayout {
        lock_unpoisoned(&self.state).layout
    }

    pub(crate) fn set_layout(&self, layout: vk::ImageLayout) {
        lock_unpoisoned(&self.state).layout = layout;
    }

    /// Timeline sequence of the last submitted write, `0` if never written.
    pub fn last_write(&self) -> u64 {
        lock_unpoisoned(&self.state).last_write
    }

    pub fn last_read(&self) -> u64 {
        lock_unpoisoned(&self.state).last_read
    }

    pub(crate) fn track_use(&self, access: Access, seq: u64) {
        let mut state = lock_unpoisoned(&self.state);
        match access {
            Access::Read => state.last_read = state.last_read.max(seq),
            Access::Write => state.last_write = state.last_write.max(seq),
        }
    }

    /// Sequence a reader (`Access::Read`) or writer (`Access::Write`) has to wait for before
    /// touching the image from outside the device.
    pub fn pending_sequence(&self, access: Access) -> u64 {
        let state = lock_unpoisoned(&self.state);
        match access {
            Access::Read => state.last_write,
            Access::Write => state.last_write.max(state.last_read),
        }
    }

    pub fn is_in_use(&self, timeline: &GpuTimeline, access: Access) -> bool {
        !timeline.is_retired(self.pending_sequence(access))
    }

    /// Range covering every mip level and array layer.
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.info.aspect,
            base_mip_level: 0,
            level_count: self.info.mip_levels,
            base_array_layer: 0,
            layer_count: self.info.num_layers,
        }
    }
}
