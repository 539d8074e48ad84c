//! 注册给发现服务的回调对象
//!
//! 对象在堆上按 `IDeckLinkDeviceNotificationCallback` 的布局排列，
//! 使用真实的原子引用计数：计数归零时释放。

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::abi::{
    IDeckLink, IDeckLinkDeviceNotificationCallback, IDeckLinkDeviceNotificationCallbackVtbl,
    IUnknownVtbl,
};
use crate::com::ComPtr;
use crate::device::DeckLink;
use crate::guid::{
    guid_from_ref_iid, RefIid, IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK, IID_IUNKNOWN,
};
use crate::hresult::HResult;
use crate::registry::DeviceRegistry;
use crate::traits::DeviceNotification;

pub(crate) struct CallbackState {
    pub(crate) handler: Box<dyn DeviceNotification>,
    pub(crate) registry: DeviceRegistry,
}

#[repr(C)]
struct CallbackObject {
    vtbl: *const IDeckLinkDeviceNotificationCallbackVtbl,
    refs: AtomicU32,
    state: Mutex<CallbackState>,
}

static CALLBACK_VTBL: IDeckLinkDeviceNotificationCallbackVtbl =
    IDeckLinkDeviceNotificationCallbackVtbl {
        base: IUnknownVtbl {
            query_interface,
            add_ref,
            release,
        },
        device_arrived,
        device_removed,
    };

/// Our own reference on the callback object.
pub(crate) struct NotificationCallback {
    com: ComPtr<IDeckLinkDeviceNotificationCallback>,
}

impl NotificationCallback {
    pub(crate) fn new(handler: Box<dyn DeviceNotification>) -> Self {
        let object = Box::new(CallbackObject {
            vtbl: &CALLBACK_VTBL,
            refs: AtomicU32::new(1),
            state: Mutex::new(CallbackState {
                handler,
                registry: DeviceRegistry::new(),
            }),
        });
        let raw = Box::into_raw(object) as *mut IDeckLinkDeviceNotificationCallback;
        // Box::into_raw 永远不会返回空指针
        let com = unsafe { ComPtr::from_raw(raw) }.unwrap_or_else(|| unreachable!());
        Self { com }
    }

    pub(crate) fn as_raw(&self) -> *mut IDeckLinkDeviceNotificationCallback {
        self.com.as_raw()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, CallbackState> {
        unsafe { lock(&*(self.com.as_raw() as *const CallbackObject)) }
    }

    #[cfg(test)]
    pub(crate) fn refs(&self) -> u32 {
        unsafe { (*(self.com.as_raw() as *const CallbackObject)).refs.load(Ordering::SeqCst) }
    }
}

impl std::fmt::Debug for NotificationCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCallback")
            .field("ptr", &self.com.as_raw())
            .finish()
    }
}

// 回调线程中发生过 panic 时锁会中毒，设备表本身仍然一致，继续使用
fn lock(object: &CallbackObject) -> MutexGuard<'_, CallbackState> {
    object
        .state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

unsafe extern "system" fn query_interface(
    this: *mut c_void,
    iid: RefIid,
    out: *mut *mut c_void,
) -> HResult {
    if out.is_null() {
        return HResult::E_POINTER;
    }
    match guid_from_ref_iid(iid) {
        Some(iid) if iid == IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK || iid == IID_IUNKNOWN => {
            add_ref(this);
            *out = this;
            HResult::S_OK
        }
        Some(iid) => {
            tracing::trace!(%iid, "callback asked for unsupported interface");
            *out = std::ptr::null_mut();
            HResult::E_NOINTERFACE
        }
        None => {
            *out = std::ptr::null_mut();
            HResult::E_POINTER
        }
    }
}

unsafe extern "system" fn add_ref(this: *mut c_void) -> u32 {
    let object = &*(this as *const CallbackObject);
    object.refs.fetch_add(1, Ordering::AcqRel) + 1
}

unsafe extern "system" fn release(this: *mut c_void) -> u32 {
    let object = &*(this as *const CallbackObject);
    let left = object.refs.fetch_sub(1, Ordering::AcqRel) - 1;
    if left == 0 {
        tracing::trace!("notification callback freed");
        drop(Box::from_raw(this as *mut CallbackObject));
    }
    left
}

unsafe extern "system" fn device_arrived(
    this: *mut IDeckLinkDeviceNotificationCallback,
    device: *mut IDeckLink,
) -> HResult {
    let object = &*(this as *const CallbackObject);
    let Some(device) = DeckLink::from_borrowed(device) else {
        tracing::warn!("DeckLinkDeviceArrived called with a null device");
        return HResult::E_POINTER;
    };

    let mut state = lock(object);
    let status = state.registry.arrived(&device);
    tracing::debug!(device = %device.id(), ?status, "DeckLinkDeviceArrived");

    dispatch(&mut state, "DeckLinkDeviceArrived", |handler| {
        handler.device_arrived(&device, status)
    })
}

unsafe extern "system" fn device_removed(
    this: *mut IDeckLinkDeviceNotificationCallback,
    device: *mut IDeckLink,
) -> HResult {
    let object = &*(this as *const CallbackObject);
    let Some(device) = DeckLink::from_borrowed(device) else {
        tracing::warn!("DeckLinkDeviceRemoved called with a null device");
        return HResult::E_POINTER;
    };

    let mut state = lock(object);
    let status = state.registry.removed(device.id());
    tracing::debug!(device = %device.id(), ?status, "DeckLinkDeviceRemoved");

    dispatch(&mut state, "DeckLinkDeviceRemoved", |handler| {
        handler.device_removed(&device, status)
    })
}

// 用户回调中的 panic 不能穿越 FFI 边界
fn dispatch(
    state: &mut CallbackState,
    call: &'static str,
    f: impl FnOnce(&mut dyn DeviceNotification),
) -> HResult {
    let handler = state.handler.as_mut();
    match catch_unwind(AssertUnwindSafe(|| f(handler))) {
        Ok(()) => HResult::S_OK,
        Err(_) => {
            tracing::error!("device notification handler panicked in {call}");
            state.registry.stats_mut().handler_panics += 1;
            HResult::E_FAIL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Change;
    use crate::guid::{Guid, IID_IDECKLINK};
    use crate::test_support::FakeDevice;
    use crate::traits::{ArrivalStatus, RemovalStatus};
    use std::sync::{Arc, Mutex as StdMutex};

    type Log = Arc<StdMutex<Vec<(usize, Change)>>>;

    fn recording() -> (Box<dyn DeviceNotification>, Log) {
        let log: Log = Arc::default();
        let sink = log.clone();
        let handler = move |device: &DeckLink, change: Change| {
            sink.lock().unwrap().push((device.id().0, change));
        };
        (Box::new(handler), log)
    }

    unsafe fn vtbl(cb: &NotificationCallback) -> &IDeckLinkDeviceNotificationCallbackVtbl {
        &*(*cb.as_raw()).vtbl
    }

    fn ref_iid(guid: Guid) -> crate::guid::RawGuid {
        guid.to_raw()
    }

    #[cfg(windows)]
    unsafe fn qi(cb: &NotificationCallback, guid: Guid, out: *mut *mut c_void) -> HResult {
        let raw = ref_iid(guid);
        (vtbl(cb).base.query_interface)(cb.as_raw().cast(), &raw, out)
    }

    #[cfg(not(windows))]
    unsafe fn qi(cb: &NotificationCallback, guid: Guid, out: *mut *mut c_void) -> HResult {
        (vtbl(cb).base.query_interface)(cb.as_raw().cast(), ref_iid(guid), out)
    }

    #[test]
    fn arrival_and_removal_reach_handler() {
        let (handler, log) = recording();
        let cb = NotificationCallback::new(handler);
        let fake = FakeDevice::new("DeckLink 8K Pro", "DeckLink 8K Pro (1)");

        unsafe {
            assert_eq!((vtbl(&cb).device_arrived)(cb.as_raw(), fake.as_raw()), HResult::S_OK);
            assert_eq!(fake.refs(), 2, "registry holds one reference");
            assert_eq!((vtbl(&cb).device_removed)(cb.as_raw(), fake.as_raw()), HResult::S_OK);
            assert_eq!(fake.refs(), 1, "reference released on removal");
        }

        let id = fake.as_raw() as usize;
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (id, Change::Arrived(ArrivalStatus::New)),
                (id, Change::Removed(RemovalStatus::Tracked)),
            ]
        );
    }

    #[test]
    fn removal_without_arrival_is_unknown() {
        let (handler, log) = recording();
        let cb = NotificationCallback::new(handler);
        let fake = FakeDevice::new("UltraStudio Mini", "UltraStudio Mini");

        unsafe {
            (vtbl(&cb).device_removed)(cb.as_raw(), fake.as_raw());
        }
        assert_eq!(fake.refs(), 1);
        assert_eq!(
            log.lock().unwrap()[0].1,
            Change::Removed(RemovalStatus::Unknown)
        );
        assert_eq!(cb.state().registry.stats().unknown_removals, 1);
    }

    #[test]
    fn null_device_is_rejected() {
        let (handler, log) = recording();
        let cb = NotificationCallback::new(handler);
        let hr = unsafe { (vtbl(&cb).device_arrived)(cb.as_raw(), std::ptr::null_mut()) };
        assert_eq!(hr, HResult::E_POINTER);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn query_interface_answers_own_iids() {
        let (handler, _log) = recording();
        let cb = NotificationCallback::new(handler);
        let mut out: *mut c_void = std::ptr::null_mut();

        unsafe {
            let hr = qi(&cb, IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK, &mut out);
            assert_eq!(hr, HResult::S_OK);
            assert_eq!(out, cb.as_raw().cast());
            assert_eq!(cb.refs(), 2);
            (vtbl(&cb).base.release)(out);

            assert_eq!(qi(&cb, IID_IUNKNOWN, &mut out), HResult::S_OK);
            (vtbl(&cb).base.release)(out);

            assert_eq!(qi(&cb, IID_IDECKLINK, &mut out), HResult::E_NOINTERFACE);
            assert!(out.is_null());

            assert_eq!(qi(&cb, IID_IUNKNOWN, std::ptr::null_mut()), HResult::E_POINTER);
        }
        assert_eq!(cb.refs(), 1);
    }

    #[test]
    fn handler_panic_becomes_e_fail() {
        let handler = |_: &DeckLink, _: Change| panic!("handler bug");
        let cb = NotificationCallback::new(Box::new(handler));
        let fake = FakeDevice::new("DeckLink Quad", "DeckLink Quad (3)");

        let hr = unsafe { (vtbl(&cb).device_arrived)(cb.as_raw(), fake.as_raw()) };
        assert_eq!(hr, HResult::E_FAIL);

        let state = cb.state();
        assert_eq!(state.registry.stats().handler_panics, 1);
        assert!(state.registry.contains(crate::device::DeviceId(fake.as_raw() as usize)));
    }
}
