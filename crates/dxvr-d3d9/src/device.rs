use std::sync::{Arc, Mutex};

use ash::vk;
use bitflags::bitflags;
use tracing::{debug, trace};

use crate::cs::{Command, CommandStream};
use crate::format::{D3DFormat, MultiSampleType};
use crate::gpu::GpuDevice;
use crate::image::{Access, Image};
use crate::lock::{DeviceLock, DeviceLockGuard};
use crate::swapchain::{BackBufferType, SwapChain, SwapChainDesc};
use crate::texture::{CommonTexture, Surface, TextureDesc};
use crate::timeline::CompletionMode;
use crate::{lock_unpoisoned, D3D9Error};

bitflags! {
    /// `D3DLOCK_*` flags that affect how a resource wait behaves.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct LockFlags: u32 {
        const READONLY = 0x0000_0010;
        const NOOVERWRITE = 0x0000_1000;
        const DISCARD = 0x0000_2000;
        const DONOTWAIT = 0x0000_4000;
    }
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub completion: CompletionMode,
    /// Dispatched command-stream chunks allowed to wait for execution before the oldest runs.
    pub max_queued_chunks: usize,
    /// Implicit swap chain. `None` creates a device without back buffers.
    pub swap_chain: Option<SwapChainDesc>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            completion: CompletionMode::Immediate,
            max_queued_chunks: 32,
            swap_chain: Some(SwapChainDesc::default()),
        }
    }
}

/// D3D9 device on top of a [`GpuDevice`].
///
/// Every path that records or dispatches commands takes the device lock, so a thread holding a
/// [`DeviceLockGuard`] keeps other threads from interleaving submissions with it.
#[derive(Debug)]
pub struct D3D9Device {
    config: DeviceConfig,
    gpu: Arc<GpuDevice>,
    lock: DeviceLock,
    cs: CommandStream,
    swap_chains: Mutex<Vec<SwapChain>>,
}

impl D3D9Device {
    pub fn new(config: DeviceConfig) -> Result<Self, D3D9Error> {
        let gpu = Arc::new(GpuDevice::new(config.completion));
        Self::with_gpu_device(gpu, config)
    }

    /// Build the device on an existing [`GpuDevice`]. `config.completion` is ignored in favour
    /// of the timeline the GPU device already has.
    pub fn with_gpu_device(gpu: Arc<GpuDevice>, config: DeviceConfig) -> Result<Self, D3D9Error> {
        let swap_chains = match config.swap_chain {
            Some(desc) => vec![SwapChain::new(&gpu, desc)?],
            None => Vec::new(),
        };
        debug!(
            swap_chains = swap_chains.len(),
            max_queued_chunks = config.max_queued_chunks,
            "dxvr-d3d9 created device"
        );
        Ok(Self {
            cs: CommandStream::new(config.max_queued_chunks),
            config,
            gpu,
            lock: DeviceLock::new(),
            swap_chains: Mutex::new(swap_chains),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn gpu_device(&self) -> &Arc<GpuDevice> {
        &self.gpu
    }

    pub fn command_stream(&self) -> &CommandStream {
        &self.cs
    }

    pub fn device_lock(&self) -> &DeviceLock {
        &self.lock
    }

    /// Take the device lock. Released when the guard drops.
    pub fn lock_device(&self) -> DeviceLockGuard {
        self.lock.acquire()
    }

    pub fn create_texture(&self, desc: TextureDesc) -> Result<Arc<CommonTexture>, D3D9Error> {
        Ok(Arc::new(CommonTexture::new(self.gpu.clone(), desc)?))
    }

    pub fn create_render_target(
        &self,
        width: u32,
        height: u32,
        format: D3DFormat,
        multisample: MultiSampleType,
    ) -> Result<Arc<Surface>, D3D9Error> {
        let texture = self.create_texture(TextureDesc::render_target(
            width,
            height,
            format,
            multisample,
        ))?;
        Ok(Arc::new(Surface::new(texture, 0, 0)?))
    }

    /// Record a clear of `surface`. The surface's image is left in attachment layout.
    pub fn clear(&self, surface: &Surface) {
        let _lock = self.lock_device();
        let texture = surface.common_texture();
        let image = texture.image();
        let range = vk::ImageSubresourceRange {
            base_mip_level: surface.mip_level(),
            level_count: 1,
            base_array_layer: surface.face(),
            layer_count: 1,
            ..image.subresource_range()
        };
        let attachment = if texture.desc().format.is_depth() {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        };
        let old_layout = image.layout();
        if old_layout != attachment {
            self.record_transition(texture, &range, old_layout, attachment);
        }
        let seq = self.cs.record(Command::Clear {
            image: image.clone(),
        });
        texture.track_subresources(&range, seq);
    }

    /// Record a layout transition of `texture`'s primary image over `range`.
    ///
    /// The tracked layout changes immediately, so commands recorded afterwards observe
    /// `new_layout`.
    pub fn transform_image(
        &self,
        texture: &CommonTexture,
        range: &vk::ImageSubresourceRange,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) {
        let _lock = self.lock_device();
        self.record_transition(texture, range, old_layout, new_layout);
    }

    fn record_transition(
        &self,
        texture: &CommonTexture,
        range: &vk::ImageSubresourceRange,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) {
        let image = texture.image();
        if old_layout != image.layout() {
            debug!(
                ?old_layout,
                tracked = ?image.layout(),
                "layout transition source differs from tracked layout"
            );
        }
        let seq = self.cs.record(Command::TransitionLayout {
            image: image.clone(),
            range: *range,
            old_layout,
            new_layout,
        });
        image.set_layout(new_layout);
        texture.track_subresources(range, seq);
    }

    /// Record a resolve of a multisampled texture into its resolve image and return that image.
    ///
    /// The resolve image is created on first use and reused afterwards. Single-sample textures
    /// have nothing to resolve; their primary image is returned.
    pub fn resolve_texture(&self, texture: &CommonTexture) -> Arc<Image> {
        if !texture.is_multisampled() {
            return texture.image().clone();
        }
        let _lock = self.lock_device();
        let dst = texture.resolve_image().clone();
        let seq = self.cs.record(Command::Resolve {
            src: texture.image().clone(),
            dst: dst.clone(),
        });
        dst.set_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        texture.track_subresources(&texture.image().subresource_range(), seq);
        trace!(resolve_image = ?dst.handle(), seq, "recorded resolve");
        dst
    }

    /// Dispatch the current command-stream chunk.
    pub fn flush(&self) {
        let _lock = self.lock_device();
        self.cs.dispatch(self.gpu.timeline());
    }

    /// Execute every dispatched chunk, submitting it to the GPU.
    pub fn synchronize_cs_thread(&self) {
        let _lock = self.lock_device();
        self.cs.synchronize_all(self.gpu.timeline());
    }

    /// Make sure the work recorded up to `sequence_number` is submitted, then wait for the
    /// GPU to finish with `image`.
    ///
    /// With [`LockFlags::READONLY`] only writes are waited for. With [`LockFlags::DONOTWAIT`]
    /// nothing blocks and `false` is returned if the image is still busy.
    pub fn wait_for_resource(&self, image: &Image, sequence_number: u64, flags: LockFlags) -> bool {
        if flags.contains(LockFlags::NOOVERWRITE) {
            return true;
        }

        let timeline = self.gpu.timeline();
        {
            let _lock = self.lock_device();
            if sequence_number >= self.cs.recording_sequence() {
                self.cs.dispatch(timeline);
            }
            if sequence_number > self.cs.executed_sequence() {
                self.cs.synchronize(timeline, sequence_number);
            }
        }

        let access = if flags.contains(LockFlags::READONLY) {
            Access::Read
        } else {
            Access::Write
        };
        if flags.contains(LockFlags::DONOTWAIT) {
            return !image.is_in_use(timeline, access);
        }

        let seq = image.pending_sequence(access);
        trace!(image = ?image.handle(), seq, "waiting for resource");
        timeline.wait(seq);
        true
    }

    pub fn get_back_buffer(
        &self,
        swap_chain: u32,
        index: u32,
        kind: BackBufferType,
    ) -> Result<Arc<Surface>, D3D9Error> {
        if kind != BackBufferType::Mono {
            return Err(D3D9Error::InvalidCall(format!(
                "back buffer type {kind:?} is not supported"
            )));
        }
        let _lock = self.lock_device();
        let swap_chains = lock_unpoisoned(&self.swap_chains);
        let chain = swap_chains.get(swap_chain as usize).ok_or_else(|| {
            D3D9Error::InvalidCall(format!("swap chain {swap_chain} does not exist"))
        })?;
        chain.back_buffer(index).cloned().ok_or_else(|| {
            D3D9Error::InvalidCall(format!(
                "back buffer {index} out of range (swap chain has {})",
                chain.back_buffer_count()
            ))
        })
    }

    pub fn swap_chain_desc(&self, swap_chain: u32) -> Option<SwapChainDesc> {
        lock_unpoisoned(&self.swap_chains)
            .get(swap_chain as usize)
            .map(|chain| *chain.desc())
    }

    /// Recreate the implicit swap chain. Previously returned back buffers keep their old
    /// images; new calls to [`Self::get_back_buffer`] return the new ones.
    pub fn reset(&self, desc: SwapChainDesc) -> Result<(), D3D9Error> {
        let _lock = self.lock_device();
        self.cs.dispatch(self.gpu.timeline());
        self.cs.synchronize_all(self.gpu.timeline());

        let chain = SwapChain::new(&self.gpu, desc)?;
        let mut swap_chains = lock_unpoisoned(&self.swap_chains);
        match swap_chains.first_mut() {
            Some(slot) => *slot = chain,
            None => swap_chains.push(chain),
        }
        debug!(width = desc.width, height = desc.height, "reset implicit swap chain");
        Ok(())
    }

    /// Present back buffer 0 of the implicit swap chain and rotate the back buffers.
    pub fn present(&self) -> Result<(), D3D9Error> {
        let _lock = self.lock_device();
        {
            let mut swap_chains = lock_unpoisoned(&self.swap_chains);
            let chain = swap_chains
                .first_mut()
                .ok_or_else(|| D3D9Error::InvalidCall("device has no swap chain".into()))?;
            if let Some(surface) = chain.back_buffer(0).cloned() {
                let texture = surface.common_texture();
                let image = if texture.is_multisampled() {
                    self.resolve_texture(texture)
                } else {
                    let image = texture.image().clone();
                    self.record_transition(
                        texture,
                        &image.subresource_range(),
                        image.layout(),
                        vk::ImageLayout::PRESENT_SRC_KHR,
                    );
                    image
                };
                self.cs.record(Command::Present { image });
            }
            chain.rotate();
        }
        self.cs.dispatch(self.gpu.timeline());
        Ok(())
    }
}
