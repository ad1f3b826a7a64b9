//! Structures exchanged with the VR runtime.
//!
//! Field order and widths are part of the contract with a separately compiled component:
//! 64-bit image handle, pointer-sized dispatchable handles, then 32-bit queue family,
//! dimensions, format and sample count.

use std::ffi::c_void;
use std::ptr;

use ash::vk;

/// Native description of a surface's image.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureVrDesc {
    /// `VkImage` as a 64-bit value.
    pub image: u64,
    pub device: vk::Device,
    pub physical_device: vk::PhysicalDevice,
    pub instance: vk::Instance,
    pub queue: vk::Queue,
    pub queue_family_index: u32,
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    pub sample_count: u32,
}

impl TextureVrDesc {
    pub fn zeroed() -> Self {
        Self {
            image: 0,
            device: vk::Device::null(),
            physical_device: vk::PhysicalDevice::null(),
            instance: vk::Instance::null(),
            queue: vk::Queue::null(),
            queue_family_index: 0,
            width: 0,
            height: 0,
            format: vk::Format::UNDEFINED,
            sample_count: 0,
        }
    }
}

impl Default for TextureVrDesc {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// The compositor's Vulkan texture description. Same layout as [`TextureVrDesc`], with the
/// format carried as a plain `u32`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VrVulkanTextureData {
    pub image: u64,
    pub device: vk::Device,
    pub physical_device: vk::PhysicalDevice,
    pub instance: vk::Instance,
    pub queue: vk::Queue,
    pub queue_family_index: u32,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub sample_count: u32,
}

impl VrVulkanTextureData {
    pub fn zeroed() -> Self {
        Self::from(TextureVrDesc::zeroed())
    }
}

impl From<TextureVrDesc> for VrVulkanTextureData {
    fn from(desc: TextureVrDesc) -> Self {
        Self {
            image: desc.image,
            device: desc.device,
            physical_device: desc.physical_device,
            instance: desc.instance,
            queue: desc.queue,
            queue_family_index: desc.queue_family_index,
            width: desc.width,
            height: desc.height,
            format: desc.format.as_raw() as u32,
            sample_count: desc.sample_count,
        }
    }
}

/// Compositor texture type tag.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    Invalid = -1,
    DirectX = 0,
    OpenGl = 1,
    Vulkan = 2,
}

/// Compositor color space tag.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Auto = 0,
    Gamma = 1,
    Linear = 2,
}

/// Compositor texture submission record. `handle` points at the API-specific description.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VrTexture {
    pub handle: *mut c_void,
    pub texture_type: TextureType,
    pub color_space: ColorSpace,
}

/// Caller-owned storage filled by
/// [`Direct3DVr9::get_back_buffer_data`](crate::Direct3DVr9::get_back_buffer_data).
///
/// After a successful fill `vr_texture.handle` points at `vulkan_data` inside the same value, so
/// the holder must stay where it is until the compositor has consumed it.
#[repr(C)]
#[derive(Debug)]
pub struct SharedTextureHolder {
    pub vulkan_data: VrVulkanTextureData,
    pub vr_texture: VrTexture,
}

impl SharedTextureHolder {
    /// All-zero holder. Zero is `TextureType::DirectX` and `ColorSpace::Auto`.
    pub fn zeroed() -> Self {
        Self {
            vulkan_data: VrVulkanTextureData::zeroed(),
            vr_texture: VrTexture {
                handle: ptr::null_mut(),
                texture_type: TextureType::DirectX,
                color_space: ColorSpace::Auto,
            },
        }
    }

    /// Whether `vr_texture.handle` points at this holder's `vulkan_data`.
    pub fn is_self_referencing(&self) -> bool {
        ptr::eq(
            self.vr_texture.handle as *const VrVulkanTextureData,
            &self.vulkan_data,
        )
    }
}

impl Default for SharedTextureHolder {
    fn default() -> Self {
        Self::zeroed()
    }
}
