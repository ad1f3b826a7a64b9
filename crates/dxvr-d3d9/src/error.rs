use thiserror::Error;

pub const D3D_OK: i32 = 0;
pub const D3DERR_INVALIDCALL: i32 = 0x8876_086C_u32 as i32;
pub const D3DERR_NOTAVAILABLE: i32 = 0x8876_086A_u32 as i32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum D3D9Error {
    #[error("invalid call: {0}")]
    InvalidCall(String),
    #[error("not available: {0}")]
    NotAvailable(String),
    #[error("unsupported D3D format {0}")]
    UnsupportedFormat(u32),
}

impl D3D9Error {
    /// The `HRESULT` a D3D9 caller would observe for this error.
    pub fn hresult(&self) -> i32 {
        match self {
            D3D9Error::InvalidCall(_) => D3DERR_INVALIDCALL,
            D3D9Error::NotAvailable(_) | D3D9Error::UnsupportedFormat(_) => D3DERR_NOTAVAILABLE,
        }
    }
}
