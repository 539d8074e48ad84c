//! Minimal in-process `IDeckLink` objects for unit tests.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::abi::{IDeckLink, IDeckLinkVtbl, IUnknownVtbl};
use crate::com::ComPtr;
use crate::device::DeckLink;
use crate::guid::{guid_from_ref_iid, RefIid, IID_IDECKLINK, IID_IUNKNOWN};
use crate::hresult::HResult;
use crate::strings::{self, RawSdkString};

#[repr(C)]
struct FakeObject {
    vtbl: *const IDeckLinkVtbl,
    refs: AtomicU32,
    model: String,
    display: String,
}

static FAKE_VTBL: IDeckLinkVtbl = IDeckLinkVtbl {
    base: IUnknownVtbl {
        query_interface,
        add_ref,
        release,
    },
    get_model_name,
    get_display_name,
};

unsafe extern "system" fn query_interface(
    this: *mut c_void,
    iid: RefIid,
    out: *mut *mut c_void,
) -> HResult {
    match guid_from_ref_iid(iid) {
        Some(g) if g == IID_IDECKLINK || g == IID_IUNKNOWN => {
            add_ref(this);
            *out = this;
            HResult::S_OK
        }
        _ => {
            *out = std::ptr::null_mut();
            HResult::E_NOINTERFACE
        }
    }
}

unsafe extern "system" fn add_ref(this: *mut c_void) -> u32 {
    (*(this as *const FakeObject)).refs.fetch_add(1, Ordering::SeqCst) + 1
}

unsafe extern "system" fn release(this: *mut c_void) -> u32 {
    let left = (*(this as *const FakeObject)).refs.fetch_sub(1, Ordering::SeqCst) - 1;
    if left == 0 {
        drop(Box::from_raw(this as *mut FakeObject));
    }
    left
}

unsafe extern "system" fn get_model_name(this: *mut IDeckLink, out: *mut RawSdkString) -> HResult {
    *out = strings::alloc(&(*(this as *const FakeObject)).model);
    HResult::S_OK
}

unsafe extern "system" fn get_display_name(
    this: *mut IDeckLink,
    out: *mut RawSdkString,
) -> HResult {
    *out = strings::alloc(&(*(this as *const FakeObject)).display);
    HResult::S_OK
}

/// Owns one reference on a fake device for the duration of a test.
pub(crate) struct FakeDevice {
    handle: DeckLink,
    raw: *mut FakeObject,
}

impl FakeDevice {
    pub(crate) fn new(model: &str, display: &str) -> Self {
        let raw = Box::into_raw(Box::new(FakeObject {
            vtbl: &FAKE_VTBL,
            refs: AtomicU32::new(1),
            model: model.to_string(),
            display: display.to_string(),
        }));
        let com = unsafe { ComPtr::from_raw(raw as *mut IDeckLink) }.expect("non-null");
        Self {
            handle: DeckLink::from_com(com),
            raw,
        }
    }

    pub(crate) fn handle(&self) -> DeckLink {
        self.handle.clone()
    }

    pub(crate) fn as_raw(&self) -> *mut IDeckLink {
        self.raw as *mut IDeckLink
    }

    pub(crate) fn refs(&self) -> u32 {
        unsafe { (*self.raw).refs.load(Ordering::SeqCst) }
    }
}
