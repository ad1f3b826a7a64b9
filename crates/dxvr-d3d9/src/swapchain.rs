use std::sync::Arc;

use crate::format::{D3DFormat, MultiSampleType};
use crate::gpu::GpuDevice;
use crate::texture::{CommonTexture, Surface, TextureDesc};
use crate::D3D9Error;

/// `D3DPRESENT_BACK_BUFFERS_MAX`.
pub const MAX_BACK_BUFFERS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub format: D3DFormat,
    pub multisample: MultiSampleType,
    /// `0` is treated as `1`.
    pub back_buffer_count: u32,
}

impl SwapChainDesc {
    pub fn new(width: u32, height: u32, format: D3DFormat) -> Self {
        Self {
            width,
            height,
            format,
            multisample: MultiSampleType::NONE,
            back_buffer_count: 1,
        }
    }
}

impl Default for SwapChainDesc {
    fn default() -> Self {
        Self::new(1280, 720, D3DFormat::X8R8G8B8)
    }
}

/// `D3DBACKBUFFER_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BackBufferType {
    Mono = 0,
    Left = 1,
    Right = 2,
}

#[derive(Debug)]
pub struct SwapChain {
    desc: SwapChainDesc,
    back_buffers: Vec<Arc<Surface>>,
}

impl SwapChain {
    pub fn new(device: &Arc<GpuDevice>, mut desc: SwapChainDesc) -> Result<Self, D3D9Error> {
        if desc.format.is_depth() {
            return Err(D3D9Error::InvalidCall(format!(
                "back buffer format {:?} is not a color format",
                desc.format
            )));
        }
        desc.back_buffer_count = desc.back_buffer_count.max(1);
        if desc.back_buffer_count > MAX_BACK_BUFFERS {
            return Err(D3D9Error::InvalidCall(format!(
                "back buffer count {} exceeds {MAX_BACK_BUFFERS}",
                desc.back_buffer_count
            )));
        }

        let back_buffers = (0..desc.back_buffer_count)
            .map(|_| {
                let texture = CommonTexture::new(
                    device.clone(),
                    TextureDesc::render_target(
                        desc.width,
                        desc.height,
                        desc.format,
                        desc.multisample,
                    ),
                )?;
                Ok(Arc::new(Surface::new(Arc::new(texture), 0, 0)?))
            })
            .collect::<Result<Vec<_>, D3D9Error>>()?;

        Ok(Self { desc, back_buffers })
    }

    pub fn desc(&self) -> &SwapChainDesc {
        &self.desc
    }

    pub fn back_buffer_count(&self) -> u32 {
        self.back_buffers.len() as u32
    }

    pub fn back_buffer(&self, index: u32) -> Option<&Arc<Surface>> {
        self.back_buffers.get(index as usize)
    }

    /// Back buffer 0 becomes the last one after a present.
    pub(crate) fn rotate(&mut self) {
        if self.back_buffers.len() > 1 {
            self.back_buffers.rotate_left(1);
        }
    }
}
