//! `dxvr-d3d9` models the parts of a D3D9-on-explicit-API device that external consumers of
//! its images depend on:
//! - native handles of the device, queue, physical device and instance ([`GpuDevice`]),
//! - images with tracked layout and completion sequence numbers ([`Image`]),
//! - textures/surfaces with a lazily created resolve image for multisampled targets
//!   ([`CommonTexture`], [`Surface`]),
//! - a command stream that batches recorded work into chunks before submission
//!   ([`CommandStream`]) and a monotonic submission timeline ([`GpuTimeline`]),
//! - a recursive device lock serializing submission ([`DeviceLock`]).

use std::sync::{Mutex, MutexGuard, PoisonError};

mod cs;
mod device;
mod error;
mod gpu;
mod image;
mod lock;
mod swapchain;
mod texture;
mod timeline;

pub mod format;

pub use cs::CommandStream;
pub use device::{D3D9Device, DeviceConfig, LockFlags};
pub use error::{D3D9Error, D3DERR_INVALIDCALL, D3DERR_NOTAVAILABLE, D3D_OK};
pub use format::{D3DFormat, FormatMapping, MultiSampleType};
pub use gpu::{DeviceQueue, DeviceQueues, GpuDevice, RawDeviceHandles};
pub use image::{Access, Image, ImageCreateInfo};
pub use lock::{DeviceLock, DeviceLockGuard};
pub use swapchain::{BackBufferType, SwapChain, SwapChainDesc, MAX_BACK_BUFFERS};
pub use texture::{CommonTexture, Surface, TextureDesc};
pub use timeline::{CompletionMode, GpuTimeline};

/// Every state guarded in this crate stays consistent across a panic, so a poisoned lock is
/// still usable.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
