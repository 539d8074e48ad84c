use thiserror::Error;

use crate::hresult::HResult;

#[derive(Error, Debug)]
pub enum DeckLinkError {
    #[error("DeckLink API library could not be loaded (tried: {tried}): {reason}")]
    LibraryUnavailable {
        tried: String,
        reason: String, // 最后一次加载失败的原因
    },

    #[error("DeckLink API library does not export a discovery factory (tried: {tried})")]
    EntryPointMissing { tried: String },

    #[error("creating IDeckLinkDiscovery failed")]
    DiscoveryUnavailable,

    #[error("{call} failed. HRESULT={hr}")]
    Com { call: &'static str, hr: HResult },

    #[error("Device notifications are already installed on this discovery instance")]
    AlreadyInstalled,

    #[error("No DeckLink backend available for this platform")]
    BackendUnavailable,
}

impl DeckLinkError {
    pub fn com(call: &'static str, hr: HResult) -> Self {
        DeckLinkError::Com { call, hr }
    }

    /// The driver status code, when the failure came from a COM call.
    pub fn hresult(&self) -> Option<HResult> {
        match self {
            DeckLinkError::Com { hr, .. } => Some(*hr),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckLinkError>;
