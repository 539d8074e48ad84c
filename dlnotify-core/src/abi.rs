//! DeckLink 接口的二进制布局
//!
//! 每个接口对象的第一个字段都是指向虚函数表的指针，虚函数表以 IUnknown 的三个方法开头。
//! SDK 在所有平台上都遵循这一布局 (Linux/macOS 上 C++ 虚析构函数的槽位排在末尾，不影响前缀)。

use std::ffi::c_void;

use crate::guid::RefIid;
use crate::hresult::HResult;
use crate::strings::RawSdkString;

pub type QueryInterfaceFn =
    unsafe extern "system" fn(this: *mut c_void, iid: RefIid, out: *mut *mut c_void) -> HResult;
pub type AddRefFn = unsafe extern "system" fn(this: *mut c_void) -> u32;
pub type ReleaseFn = unsafe extern "system" fn(this: *mut c_void) -> u32;

#[repr(C)]
#[allow(missing_debug_implementations)]
pub struct IUnknownVtbl {
    pub query_interface: QueryInterfaceFn,
    pub add_ref: AddRefFn,
    pub release: ReleaseFn,
}

#[repr(C)]
#[derive(Debug)]
pub struct IUnknown {
    pub vtbl: *const IUnknownVtbl,
}

#[repr(C)]
#[allow(missing_debug_implementations)]
pub struct IDeckLinkVtbl {
    pub base: IUnknownVtbl,
    pub get_model_name:
        unsafe extern "system" fn(this: *mut IDeckLink, name: *mut RawSdkString) -> HResult,
    pub get_display_name:
        unsafe extern "system" fn(this: *mut IDeckLink, name: *mut RawSdkString) -> HResult,
}

/// One attached device.
#[repr(C)]
#[derive(Debug)]
pub struct IDeckLink {
    pub vtbl: *const IDeckLinkVtbl,
}

#[repr(C)]
#[allow(missing_debug_implementations)]
pub struct IDeckLinkDiscoveryVtbl {
    pub base: IUnknownVtbl,
    pub install_device_notifications: unsafe extern "system" fn(
        this: *mut IDeckLinkDiscovery,
        callback: *mut IDeckLinkDeviceNotificationCallback,
    ) -> HResult,
    pub uninstall_device_notifications:
        unsafe extern "system" fn(this: *mut IDeckLinkDiscovery) -> HResult,
}

/// The device-discovery service.
#[repr(C)]
#[derive(Debug)]
pub struct IDeckLinkDiscovery {
    pub vtbl: *const IDeckLinkDiscoveryVtbl,
}

#[repr(C)]
#[allow(missing_debug_implementations)]
pub struct IDeckLinkDeviceNotificationCallbackVtbl {
    pub base: IUnknownVtbl,
    pub device_arrived: unsafe extern "system" fn(
        this: *mut IDeckLinkDeviceNotificationCallback,
        device: *mut IDeckLink,
    ) -> HResult,
    pub device_removed: unsafe extern "system" fn(
        this: *mut IDeckLinkDeviceNotificationCallback,
        device: *mut IDeckLink,
    ) -> HResult,
}

/// Callback object registered with the discovery service.
#[repr(C)]
#[derive(Debug)]
pub struct IDeckLinkDeviceNotificationCallback {
    pub vtbl: *const IDeckLinkDeviceNotificationCallbackVtbl,
}
