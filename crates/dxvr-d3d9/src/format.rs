//! D3D9 format and multisample-type mapping onto explicit-API formats.

use ash::vk;

use crate::D3D9Error;

/// Subset of `D3DFORMAT` values that can back a render target or back buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum D3DFormat {
    A8R8G8B8 = 21,
    X8R8G8B8 = 22,
    R5G6B5 = 23,
    A2B10G10R10 = 31,
    A8B8G8R8 = 32,
    X8B8G8R8 = 33,
    D24S8 = 75,
    A16B16G16R16F = 113,
}

impl D3DFormat {
    pub fn from_raw(raw: u32) -> Result<Self, D3D9Error> {
        Ok(match raw {
            21 => Self::A8R8G8B8,
            22 => Self::X8R8G8B8,
            23 => Self::R5G6B5,
            31 => Self::A2B10G10R10,
            32 => Self::A8B8G8R8,
            33 => Self::X8B8G8R8,
            75 => Self::D24S8,
            113 => Self::A16B16G16R16F,
            other => return Err(D3D9Error::UnsupportedFormat(other)),
        })
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    pub fn is_depth(self) -> bool {
        matches!(self, Self::D24S8)
    }
}

/// How a D3D9 format is represented on the explicit API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMapping {
    /// Linear view format. This is the format reported to external consumers.
    pub format_color: vk::Format,
    /// sRGB view format, or `UNDEFINED` when the format has no sRGB variant.
    pub format_srgb: vk::Format,
    pub aspect: vk::ImageAspectFlags,
}

pub fn format_mapping(format: D3DFormat) -> FormatMapping {
    let color = |format_color, format_srgb| FormatMapping {
        format_color,
        format_srgb,
        aspect: vk::ImageAspectFlags::COLOR,
    };

    match format {
        // X8 formats share the storage of their A8 counterparts; alpha is swizzled to one on read.
        D3DFormat::A8R8G8B8 | D3DFormat::X8R8G8B8 => {
            color(vk::Format::B8G8R8A8_UNORM, vk::Format::B8G8R8A8_SRGB)
        }
        D3DFormat::A8B8G8R8 | D3DFormat::X8B8G8R8 => {
            color(vk::Format::R8G8B8A8_UNORM, vk::Format::R8G8B8A8_SRGB)
        }
        D3DFormat::R5G6B5 => color(vk::Format::R5G6B5_UNORM_PACK16, vk::Format::UNDEFINED),
        D3DFormat::A2B10G10R10 => {
            color(vk::Format::A2B10G10R10_UNORM_PACK32, vk::Format::UNDEFINED)
        }
        D3DFormat::A16B16G16R16F => {
            color(vk::Format::R16G16B16A16_SFLOAT, vk::Format::UNDEFINED)
        }
        D3DFormat::D24S8 => FormatMapping {
            format_color: vk::Format::D24_UNORM_S8_UINT,
            format_srgb: vk::Format::UNDEFINED,
            aspect: vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        },
    }
}

/// `D3DMULTISAMPLE_TYPE`.
///
/// `0` is no multisampling, `1` is the non-maskable type and `2..=16` request that many
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MultiSampleType(pub u32);

impl MultiSampleType {
    pub const NONE: Self = Self(0);
    pub const NONMASKABLE: Self = Self(1);

    pub const fn samples(count: u32) -> Self {
        Self(count)
    }

    /// Whether the surface needs a resolve before anything outside the device may read it.
    pub fn is_multisampled(self) -> bool {
        self != Self::NONE
    }

    /// Largest supported power-of-two sample count not above the requested count.
    pub fn sample_count(self) -> Result<vk::SampleCountFlags, D3D9Error> {
        Ok(match self.0 {
            0 | 1 => vk::SampleCountFlags::TYPE_1,
            2..=3 => vk::SampleCountFlags::TYPE_2,
            4..=7 => vk::SampleCountFlags::TYPE_4,
            8..=15 => vk::SampleCountFlags::TYPE_8,
            16 => vk::SampleCountFlags::TYPE_16,
            other => {
                return Err(D3D9Error::NotAvailable(format!(
                    "multisample type {other} exceeds 16 samples"
                )))
            }
        })
    }
}
