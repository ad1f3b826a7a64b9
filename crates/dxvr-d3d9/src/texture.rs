//! Textures and the surfaces that view them.
//!
//! A [`CommonTexture`] owns one primary [`Image`]. Multisampled textures additionally own a
//! single-sample resolve image, created the first time it is requested and reused afterwards.

use std::sync::{Arc, Mutex, OnceLock};

use ash::vk;

use crate::format::{format_mapping, D3DFormat, FormatMapping, MultiSampleType};
use crate::gpu::GpuDevice;
use crate::image::{Image, ImageCreateInfo};
use crate::{lock_unpoisoned, D3D9Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: D3DFormat,
    pub multisample: MultiSampleType,
    pub mip_levels: u32,
    pub array_layers: u32,
}

impl TextureDesc {
    /// Single-level, single-layer render target.
    pub fn render_target(
        width: u32,
        height: u32,
        format: D3DFormat,
        multisample: MultiSampleType,
    ) -> Self {
        Self {
            width,
            height,
            format,
            multisample,
            mip_levels: 1,
            array_layers: 1,
        }
    }
}

#[derive(Debug)]
pub struct CommonTexture {
    desc: TextureDesc,
    mapping: FormatMapping,
    device: Arc<GpuDevice>,
    image: Arc<Image>,
    resolve_image: OnceLock<Arc<Image>>,
    /// Command-stream chunk that last touched each subresource (`layer * mip_levels + mip`).
    sequence_numbers: Mutex<Vec<u64>>,
}

impl CommonTexture {
    pub fn new(device: Arc<GpuDevice>, desc: TextureDesc) -> Result<Self, D3D9Error> {
        if desc.width == 0 || desc.height == 0 {
            return Err(D3D9Error::InvalidCall(format!(
                "texture width/height must be non-zero (got {}x{})",
                desc.width, desc.height
            )));
        }
        if desc.mip_levels == 0 || desc.array_layers == 0 {
            return Err(D3D9Error::InvalidCall(
                "texture needs at least one mip level and one layer".into(),
            ));
        }
        let subresources = desc.mip_levels.checked_mul(desc.array_layers).ok_or_else(|| {
            D3D9Error::InvalidCall(format!(
                "texture subresource count overflows ({} mips x {} layers)",
                desc.mip_levels, desc.array_layers
            ))
        })?;
        if desc.multisample.is_multisampled() && desc.mip_levels > 1 {
            return Err(D3D9Error::InvalidCall(
                "multisampled textures cannot have mip levels".into(),
            ));
        }

        let mapping = format_mapping(desc.format);
        let sample_count = desc.multisample.sample_count()?;
        let usage = if desc.format.is_depth() {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
        };

        let image = device.create_image(ImageCreateInfo {
            extent: vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            },
            format: mapping.format_color,
            aspect: mapping.aspect,
            sample_count,
            mip_levels: desc.mip_levels,
            num_layers: desc.array_layers,
            usage,
            layout: vk::ImageLayout::UNDEFINED,
        });

        Ok(Self {
            desc,
            mapping,
            device,
            image,
            resolve_image: OnceLock::new(),
            sequence_numbers: Mutex::new(vec![0; subresources as usize]),
        })
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn format_mapping(&self) -> &FormatMapping {
        &self.mapping
    }

    pub fn device(&self) -> &Arc<GpuDevice> {
        &self.device
    }

    /// The primary image. Multisampled if the texture is.
    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn is_multisampled(&self) -> bool {
        self.desc.multisample.is_multisampled()
    }

    /// Single-sample image the primary image resolves into. Created on first use.
    pub fn resolve_image(&self) -> &Arc<Image> {
        self.resolve_image.get_or_init(|| {
            let info = self.image.info();
            self.device.create_image(ImageCreateInfo {
                sample_count: vk::SampleCountFlags::TYPE_1,
                usage: vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST,
                layout: vk::ImageLayout::UNDEFINED,
                ..*info
            })
        })
    }

    /// The resolve image if it has been created.
    pub fn existing_resolve_image(&self) -> Option<&Arc<Image>> {
        self.resolve_image.get()
    }

    pub fn subresource_count(&self) -> u32 {
        self.desc.mip_levels * self.desc.array_layers
    }

    pub fn subresource_index(&self, layer: u32, mip_level: u32) -> u32 {
        layer * self.desc.mip_levels + mip_level
    }

    /// Command-stream chunk that last touched `subresource`, `0` if none has.
    pub fn mapping_buffer_sequence_number(&self, subresource: u32) -> u64 {
        lock_unpoisoned(&self.sequence_numbers)
            .get(subresource as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Ranges may use `vk::REMAINING_ARRAY_LAYERS`/`vk::REMAINING_MIP_LEVELS`; anything past the
    /// texture's extent is ignored.
    pub(crate) fn track_subresources(&self, range: &vk::ImageSubresourceRange, seq: u64) {
        let mut seqs = lock_unpoisoned(&self.sequence_numbers);
        let layer_end = range
            .base_array_layer
            .saturating_add(range.layer_count)
            .min(self.desc.array_layers);
        let mip_end = range
            .base_mip_level
            .saturating_add(range.level_count)
            .min(self.desc.mip_levels);
        for layer in range.base_array_layer..layer_end {
            for mip in range.base_mip_level..mip_end {
                let index = self.subresource_index(layer, mip) as usize;
                seqs[index] = seqs[index].max(seq);
            }
        }
    }
}

/// A single face/mip of a texture, usable as a render target.
#[derive(Debug, Clone)]
pub struct Surface {
    texture: Arc<CommonTexture>,
    face: u32,
    mip_level: u32,
}

impl Surface {
    pub fn new(texture: Arc<CommonTexture>, face: u32, mip_level: u32) -> Result<Self, D3D9Error> {
        let desc = texture.desc();
        if face >= desc.array_layers || mip_level >= desc.mip_levels {
            return Err(D3D9Error::InvalidCall(format!(
                "surface face {face} mip {mip_level} out of range ({} layers, {} mips)",
                desc.array_layers, desc.mip_levels
            )));
        }
        Ok(Self {
            texture,
            face,
            mip_level,
        })
    }

    pub fn common_texture(&self) -> &Arc<CommonTexture> {
        &self.texture
    }

    pub fn face(&self) -> u32 {
        self.face
    }

    pub fn mip_level(&self) -> u32 {
        self.mip_level
    }

    pub fn subresource(&self) -> u32 {
        self.texture.subresource_index(self.face, self.mip_level)
    }

    pub fn width(&self) -> u32 {
        (self.texture.desc().width >> self.mip_level).max(1)
    }

    pub fn height(&self) -> u32 {
        (self.texture.desc().height >> self.mip_level).max(1)
    }
}
