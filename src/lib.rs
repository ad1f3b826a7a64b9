//! D3D9 device model with a VR interop adapter.
//!
//! [`d3d9`] models the emulated device (surfaces, swap chain, command stream, GPU timeline and
//! device lock). [`vr`] exposes those surfaces to a VR runtime.

pub use dxvr_d3d9 as d3d9;
pub use dxvr_vr as vr;
