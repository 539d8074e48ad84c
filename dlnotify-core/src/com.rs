use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::abi::{
    IDeckLink, IDeckLinkDeviceNotificationCallback, IDeckLinkDiscovery, IUnknown, IUnknownVtbl,
};
use crate::guid::{
    Guid, IID_IDECKLINK, IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK, IID_IDECKLINK_DISCOVERY,
    IID_IUNKNOWN,
};

/// 由 SDK 定义的 COM 风格接口
///
/// # Safety
/// 实现者必须是 `#[repr(C)]` 且第一个字段为虚函数表指针，
/// 虚函数表以 [`IUnknownVtbl`] 开头。
/// DeckLink 对象是自由线程的，因此句柄可以跨线程传递。
pub unsafe trait Interface {
    const IID: Guid;
}

unsafe impl Interface for IUnknown {
    const IID: Guid = IID_IUNKNOWN;
}

unsafe impl Interface for IDeckLink {
    const IID: Guid = IID_IDECKLINK;
}

unsafe impl Interface for IDeckLinkDiscovery {
    const IID: Guid = IID_IDECKLINK_DISCOVERY;
}

unsafe impl Interface for IDeckLinkDeviceNotificationCallback {
    const IID: Guid = IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK;
}

/// Owning interface pointer: `Clone` is `AddRef`, `Drop` is `Release`.
pub struct ComPtr<T: Interface> {
    ptr: NonNull<T>,
}

unsafe impl<T: Interface> Send for ComPtr<T> {}
unsafe impl<T: Interface> Sync for ComPtr<T> {}

impl<T: Interface> ComPtr<T> {
    /// Takes over a reference the caller already owns.
    ///
    /// # Safety
    /// `ptr` must be null or a live interface pointer of type `T` carrying one
    /// reference that is transferred to the returned value.
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Takes a new reference on a pointer we were only lent (callback arguments).
    ///
    /// # Safety
    /// `ptr` must be null or a live interface pointer of type `T`.
    pub unsafe fn from_borrowed(ptr: *mut T) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        (unknown_vtbl(ptr).add_ref)(ptr.as_ptr().cast());
        Some(Self { ptr })
    }

    pub fn as_raw(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Address of the object, stable for its lifetime.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// # Safety
    /// The returned table is only valid while `self` holds its reference.
    pub(crate) unsafe fn vtbl<V>(&self) -> &V {
        &**(self.ptr.as_ptr() as *const *const V)
    }
}

unsafe fn unknown_vtbl<'a, T>(ptr: NonNull<T>) -> &'a IUnknownVtbl {
    &**(ptr.as_ptr() as *const *const IUnknownVtbl)
}

impl<T: Interface> Clone for ComPtr<T> {
    fn clone(&self) -> Self {
        unsafe {
            (unknown_vtbl(self.ptr).add_ref)(self.ptr.as_ptr().cast::<c_void>());
        }
        Self { ptr: self.ptr }
    }
}

impl<T: Interface> Drop for ComPtr<T> {
    fn drop(&mut self) {
        unsafe {
            (unknown_vtbl(self.ptr).release)(self.ptr.as_ptr().cast::<c_void>());
        }
    }
}

impl<T: Interface> PartialEq for ComPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Interface> Eq for ComPtr<T> {}

impl<T: Interface> fmt::Debug for ComPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComPtr")
            .field("iid", &T::IID)
            .field("ptr", &self.ptr)
            .finish()
    }
}
