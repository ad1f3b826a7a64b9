use std::ffi::c_void;
use std::sync::{Arc, Mutex, PoisonError};

use ash::vk::{self, Handle};
use dxvr_d3d9::{BackBufferType, D3D9Device, DeviceLockGuard, LockFlags, Surface};
use tracing::{debug, trace, warn};

use crate::abi::{
    ColorSpace, SharedTextureHolder, TextureType, TextureVrDesc, VrTexture, VrVulkanTextureData,
};
use crate::config::VrConfig;
use crate::error::VrError;
use crate::guid::{Guid, IID_IDIRECT3D_VR9, IID_IUNKNOWN};

/// Operations a VR runtime uses to take frames out of a D3D9 device.
///
/// `None` stands in for a null argument and is rejected with [`VrError::InvalidArgument`]
/// before any work is done.
pub trait Direct3DVr9: Send + Sync {
    /// Describe the image behind `surface`. Multisampled surfaces are resolved first and the
    /// resolve image is described instead. The handles are only valid for the current frame.
    fn get_vr_desc(&self, surface: Option<&Surface>) -> Result<TextureVrDesc, VrError>;

    /// Transition the surface's image to transfer-source layout, optionally blocking until the
    /// GPU has finished every write to it.
    fn transfer_surface(
        &self,
        surface: Option<&Surface>,
        wait_resource_idle: bool,
    ) -> Result<(), VrError>;

    /// Take the device lock and keep it until [`Self::unlock_device`].
    fn lock_device(&self) -> Result<(), VrError>;

    fn unlock_device(&self) -> Result<(), VrError>;

    /// Submit everything and block until the GPU is idle. Not meant for per-frame use.
    fn wait_device_idle(&self) -> Result<(), VrError>;

    /// Describe back buffer 0 of the implicit swap chain into `back_buffer_data`.
    ///
    /// The compositor tags and texture handle are written even when the back buffer cannot
    /// be fetched; the fetch error is still returned and the description is zeroed.
    fn get_back_buffer_data(
        &self,
        back_buffer_data: Option<&mut SharedTextureHolder>,
    ) -> Result<(), VrError>;
}

#[derive(Debug)]
pub struct D3D9Vr {
    device: Arc<D3D9Device>,
    config: VrConfig,
    held_lock: Mutex<Option<DeviceLockGuard>>,
}

/// Create the VR interface for `device`.
pub fn create_vr_interface(device: Arc<D3D9Device>, config: VrConfig) -> Arc<D3D9Vr> {
    debug!(validation = config.validation, "created D3D9 VR interface");
    Arc::new(D3D9Vr {
        device,
        config,
        held_lock: Mutex::new(None),
    })
}

impl D3D9Vr {
    pub fn device(&self) -> &Arc<D3D9Device> {
        &self.device
    }

    pub fn config(&self) -> &VrConfig {
        &self.config
    }

    /// Whether [`Direct3DVr9::lock_device`] is currently in effect.
    pub fn holds_device_lock(&self) -> bool {
        self.held_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn query_interface(self: &Arc<Self>, riid: &Guid) -> Result<Arc<dyn Direct3DVr9>, VrError> {
        if *riid == IID_IUNKNOWN || *riid == IID_IDIRECT3D_VR9 {
            let iface: Arc<dyn Direct3DVr9> = self.clone();
            return Ok(iface);
        }
        warn!(%riid, "D3D9Vr::query_interface: unknown interface query");
        Err(VrError::NoInterface(*riid))
    }
}

impl Direct3DVr9 for D3D9Vr {
    fn get_vr_desc(&self, surface: Option<&Surface>) -> Result<TextureVrDesc, VrError> {
        let surface = surface.ok_or(VrError::InvalidArgument("surface"))?;
        let texture = surface.common_texture();

        let image = if texture.is_multisampled() {
            self.device.resolve_texture(texture)
        } else {
            texture.image().clone()
        };
        let gpu = texture.device();
        let graphics = gpu.queues().graphics;

        let desc = TextureVrDesc {
            image: image.handle().as_raw(),
            device: gpu.handle(),
            physical_device: gpu.adapter(),
            instance: gpu.instance(),
            queue: graphics.queue_handle,
            queue_family_index: graphics.queue_index,
            width: texture.desc().width,
            height: texture.desc().height,
            format: texture.format_mapping().format_color,
            sample_count: image.info().sample_count.as_raw(),
        };

        if self.config.validation && desc.sample_count != vk::SampleCountFlags::TYPE_1.as_raw() {
            warn!(
                image = desc.image,
                samples = desc.sample_count,
                "VR descriptor references a multisampled image"
            );
        }
        trace!(
            image = desc.image,
            width = desc.width,
            height = desc.height,
            format = ?desc.format,
            "described surface"
        );
        Ok(desc)
    }

    fn transfer_surface(
        &self,
        surface: Option<&Surface>,
        wait_resource_idle: bool,
    ) -> Result<(), VrError> {
        let surface = surface.ok_or(VrError::InvalidArgument("surface"))?;
        let texture = surface.common_texture();
        let image = texture.image();

        let subresources = image.subresource_range();
        self.device.transform_image(
            texture,
            &subresources,
            image.layout(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );

        // Only subresource 0 is waited on; other faces and mip levels may still be in flight.
        if wait_resource_idle {
            self.device.wait_for_resource(
                image,
                texture.mapping_buffer_sequence_number(0),
                LockFlags::READONLY,
            );
        }
        trace!(image = ?image.handle(), wait_resource_idle, "transferred surface");
        Ok(())
    }

    fn lock_device(&self) -> Result<(), VrError> {
        let guard = self.device.lock_device();
        let previous = self
            .held_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(guard);
        if previous.is_some() {
            debug!("device lock taken again while already held by the VR interface");
        }
        debug!("locked device for VR");
        Ok(())
    }

    fn unlock_device(&self) -> Result<(), VrError> {
        let guard = self
            .held_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match guard {
            Some(guard) => {
                drop(guard);
                debug!("unlocked device for VR");
            }
            None if self.config.validation => {
                warn!("unlock_device called without a matching lock_device");
            }
            None => {}
        }
        Ok(())
    }

    fn wait_device_idle(&self) -> Result<(), VrError> {
        debug!("waiting for device idle");
        self.device.flush();
        self.device.synchronize_cs_thread();
        self.device.gpu_device().wait_for_idle();
        Ok(())
    }

    fn get_back_buffer_data(
        &self,
        back_buffer_data: Option<&mut SharedTextureHolder>,
    ) -> Result<(), VrError> {
        let out = back_buffer_data.ok_or(VrError::InvalidArgument("back_buffer_data"))?;

        let fetched = self.device.get_back_buffer(0, 0, BackBufferType::Mono);
        let desc = match &fetched {
            Ok(surface) => self.get_vr_desc(Some(surface.as_ref())).ok(),
            Err(err) => {
                debug!(%err, "back buffer fetch failed; packing an empty description");
                None
            }
        };

        out.vulkan_data = desc
            .map(VrVulkanTextureData::from)
            .unwrap_or_else(VrVulkanTextureData::zeroed);
        out.vr_texture = VrTexture {
            handle: (&mut out.vulkan_data as *mut VrVulkanTextureData).cast::<c_void>(),
            texture_type: TextureType::Vulkan,
            color_space: ColorSpace::Auto,
        };

        fetched.map(|_| ()).map_err(VrError::from)
    }
}
