//! 模拟的 SDK 对象：与真实驱动相同的虚函数表布局

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};

use dlnotify_core::abi::{
    IDeckLink, IDeckLinkDeviceNotificationCallback, IDeckLinkDiscovery, IDeckLinkDiscoveryVtbl,
    IDeckLinkVtbl, IUnknownVtbl,
};
use dlnotify_core::com::ComPtr;
use dlnotify_core::guid::{
    guid_from_ref_iid, Guid, RefIid, IID_IDECKLINK, IID_IDECKLINK_DISCOVERY, IID_IUNKNOWN,
};
use dlnotify_core::strings::{self, RawSdkString};
use dlnotify_core::HResult;

use crate::bus::SimulatedBus;

// --- IDeckLink ---

#[repr(C)]
pub(crate) struct DeviceObject {
    vtbl: *const IDeckLinkVtbl,
    refs: AtomicU32,
    model: String,
    display: String,
}

static DEVICE_VTBL: IDeckLinkVtbl = IDeckLinkVtbl {
    base: IUnknownVtbl {
        query_interface: device_query_interface,
        add_ref: device_add_ref,
        release: device_release,
    },
    get_model_name,
    get_display_name,
};

/// Allocates a device object; the returned pointer carries one reference.
pub(crate) fn new_device(model: &str, display: &str) -> ComPtr<IDeckLink> {
    let raw = Box::into_raw(Box::new(DeviceObject {
        vtbl: &DEVICE_VTBL,
        refs: AtomicU32::new(1),
        model: model.to_string(),
        display: display.to_string(),
    }));
    unsafe { ComPtr::from_raw(raw as *mut IDeckLink) }.unwrap_or_else(|| unreachable!())
}

/// # Safety
/// `device` must point to a live [`DeviceObject`].
pub(crate) unsafe fn device_refs(device: *mut IDeckLink) -> u32 {
    (*(device as *const DeviceObject)).refs.load(Ordering::SeqCst)
}

unsafe fn answer(
    this: *mut c_void,
    iid: RefIid,
    out: *mut *mut c_void,
    own: Guid,
    add_ref: unsafe extern "system" fn(*mut c_void) -> u32,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    match guid_from_ref_iid(iid) {
        Some(iid) if iid == own || iid == IID_IUNKNOWN => {
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

unsafe extern "system" fn device_query_interface(
    this: *mut c_void,
    iid: RefIid,
    out: *mut *mut c_void,
) -> HResult {
    answer(this, iid, out, IID_IDECKLINK, device_add_ref)
}

unsafe extern "system" fn device_add_ref(this: *mut c_void) -> u32 {
    (*(this as *const DeviceObject)).refs.fetch_add(1, Ordering::AcqRel) + 1
}

unsafe extern "system" fn device_release(this: *mut c_void) -> u32 {
    let left = (*(this as *const DeviceObject)).refs.fetch_sub(1, Ordering::AcqRel) - 1;
    if left == 0 {
        drop(Box::from_raw(this as *mut DeviceObject));
    }
    left
}

unsafe extern "system" fn get_model_name(this: *mut IDeckLink, out: *mut RawSdkString) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = strings::alloc(&(*(this as *const DeviceObject)).model);
    HResult::S_OK
}

unsafe extern "system" fn get_display_name(
    this: *mut IDeckLink,
    out: *mut RawSdkString,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    *out = strings::alloc(&(*(this as *const DeviceObject)).display);
    HResult::S_OK
}

// --- IDeckLinkDiscovery ---

#[repr(C)]
pub(crate) struct DiscoveryObject {
    vtbl: *const IDeckLinkDiscoveryVtbl,
    refs: AtomicU32,
    id: u64,
    bus: SimulatedBus,
}

static DISCOVERY_VTBL: IDeckLinkDiscoveryVtbl = IDeckLinkDiscoveryVtbl {
    base: IUnknownVtbl {
        query_interface: discovery_query_interface,
        add_ref: discovery_add_ref,
        release: discovery_release,
    },
    install_device_notifications,
    uninstall_device_notifications,
};

/// Allocates a discovery object bound to `bus`; the pointer carries one reference.
pub(crate) fn new_discovery(bus: SimulatedBus, id: u64) -> *mut IDeckLinkDiscovery {
    Box::into_raw(Box::new(DiscoveryObject {
        vtbl: &DISCOVERY_VTBL,
        refs: AtomicU32::new(1),
        id,
        bus,
    })) as *mut IDeckLinkDiscovery
}

unsafe extern "system" fn discovery_query_interface(
    this: *mut c_void,
    iid: RefIid,
    out: *mut *mut c_void,
) -> HResult {
    answer(this, iid, out, IID_IDECKLINK_DISCOVERY, discovery_add_ref)
}

unsafe extern "system" fn discovery_add_ref(this: *mut c_void) -> u32 {
    (*(this as *const DiscoveryObject)).refs.fetch_add(1, Ordering::AcqRel) + 1
}

unsafe extern "system" fn discovery_release(this: *mut c_void) -> u32 {
    let object = this as *mut DiscoveryObject;
    let left = (*object).refs.fetch_sub(1, Ordering::AcqRel) - 1;
    if left == 0 {
        let object = Box::from_raw(object);
        // 驱动在销毁时会自动注销仍然安装着的回调
        object.bus.detach(object.id);
        tracing::trace!(id = object.id, "simulated discovery destroyed");
    }
    left
}

unsafe extern "system" fn install_device_notifications(
    this: *mut IDeckLinkDiscovery,
    callback: *mut IDeckLinkDeviceNotificationCallback,
) -> HResult {
    let object = &*(this as *const DiscoveryObject);
    match ComPtr::from_borrowed(callback) {
        Some(callback) => object.bus.attach(object.id, callback),
        None => HResult::E_POINTER,
    }
}

unsafe extern "system" fn uninstall_device_notifications(this: *mut IDeckLinkDiscovery) -> HResult {
    let object = &*(this as *const DiscoveryObject);
    object.bus.detach(object.id);
    HResult::S_OK
}
