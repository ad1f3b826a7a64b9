//! VR interop for `dxvr-d3d9` devices.
//!
//! [`D3D9Vr`] hands images of a D3D9 device to a VR runtime:
//! - [`Direct3DVr9::get_vr_desc`] describes a surface's native image (resolving multisampled
//!   surfaces first),
//! - [`Direct3DVr9::transfer_surface`] moves the image into transfer-source layout and can
//!   wait for pending writes,
//! - [`Direct3DVr9::lock_device`]/[`Direct3DVr9::unlock_device`] keep other threads from
//!   submitting while the runtime reads,
//! - [`Direct3DVr9::wait_device_idle`] drains all GPU work,
//! - [`Direct3DVr9::get_back_buffer_data`] packs the current back buffer for the compositor.
//!
//! One interface is created per device with [`create_vr_interface`] and passed to whoever
//! needs it.

mod abi;
mod config;
mod error;
mod guid;
mod interop;

pub use abi::{
    ColorSpace, SharedTextureHolder, TextureType, TextureVrDesc, VrTexture, VrVulkanTextureData,
};
pub use config::{VrConfig, VALIDATION_ENV};
pub use error::{HResult, VrError};
pub use guid::{Guid, IID_IDIRECT3D_VR9, IID_IUNKNOWN};
pub use interop::{create_vr_interface, D3D9Vr, Direct3DVr9};
