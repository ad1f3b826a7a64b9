use std::fmt;

use dxvr_d3d9::{D3D9Error, D3DERR_INVALIDCALL};
use thiserror::Error;

use crate::guid::Guid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VrError {
    /// A required argument was missing. Reported before any work is done.
    #[error("required argument `{0}` is null")]
    InvalidArgument(&'static str),
    #[error("interface {0} is not supported")]
    NoInterface(Guid),
    /// Failure reported by the device, passed through unchanged.
    #[error(transparent)]
    Device(#[from] D3D9Error),
}

impl VrError {
    pub fn hresult(&self) -> HResult {
        match self {
            VrError::InvalidArgument(_) => HResult(D3DERR_INVALIDCALL),
            VrError::NoInterface(_) => HResult::E_NOINTERFACE,
            VrError::Device(err) => HResult(err.hresult()),
        }
    }
}

/// Status code as seen by a COM caller.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: Self = Self(0);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);

    pub fn succeeded(self) -> bool {
        self.0 >= 0
    }

    pub fn failed(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult(0x{:08X})", self.0 as u32)
    }
}

impl<T> From<Result<T, VrError>> for HResult {
    fn from(result: Result<T, VrError>) -> Self {
        match result {
            Ok(_) => HResult::S_OK,
            Err(err) => err.hresult(),
        }
    }
}
