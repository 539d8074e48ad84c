use std::ffi::c_void;

use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};
use windows_core::{Error as WinError, Interface, IUnknown, GUID};

use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::{DeckLinkError, Result};
use dlnotify_core::guid::{Guid, CLSID_CDECKLINK_DISCOVERY, IID_IDECKLINK_DISCOVERY};
use dlnotify_core::HResult;

use crate::apartment::ComApartment;

fn to_win_guid(guid: Guid) -> GUID {
    GUID::from_u128(guid.to_u128())
}

fn hresult_error(call: &'static str, e: WinError) -> DeckLinkError {
    DeckLinkError::com(call, HResult(e.code().0))
}

/// Creates the discovery service through the driver's registered COM class.
pub fn create_discovery() -> Result<Discovery> {
    let apartment = ComApartment::enter()?;

    let unknown: IUnknown = unsafe {
        CoCreateInstance(&to_win_guid(CLSID_CDECKLINK_DISCOVERY), None, CLSCTX_ALL)
    }
    .map_err(|e| {
        tracing::error!("CoCreateInstance(CLSID_CDeckLinkDiscovery) failed: {e}");
        hresult_error("CoCreateInstance(CLSID_CDeckLinkDiscovery)", e)
    })?;

    let mut raw: *mut c_void = std::ptr::null_mut();
    unsafe { unknown.query(&to_win_guid(IID_IDECKLINK_DISCOVERY), &mut raw) }
        .ok()
        .map_err(|e| hresult_error("IUnknown::QueryInterface(IID_IDeckLinkDiscovery)", e))?;
    drop(unknown);

    // 接口释放之后才允许反初始化 COM，因此把套间交给 Discovery 保管
    unsafe { Discovery::from_raw(raw.cast(), Some(Box::new(apartment))) }
}
