use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::abi::{IDeckLinkDiscovery, IDeckLinkDiscoveryVtbl};
use crate::callback::NotificationCallback;
use crate::com::ComPtr;
use crate::device::DeviceId;
use crate::error::{DeckLinkError, Result};
use crate::telemetry::NotificationStats;
use crate::traits::DeviceNotification;

/// 提供发现服务的资源 (动态库句柄、COM 套间等)，必须比接口指针活得更久
pub type KeepAlive = Box<dyn Any + Send + Sync>;

/// Handle to the SDK's device-discovery service.
pub struct Discovery {
    // 字段按声明顺序析构：先 Release 接口，再卸载提供者
    inner: ComPtr<IDeckLinkDiscovery>,
    installed: AtomicBool,
    _provider: Option<KeepAlive>,
}

impl Discovery {
    /// Wraps the pointer returned by a platform factory.
    ///
    /// # Safety
    /// `raw` must be null or an `IDeckLinkDiscovery` pointer carrying one
    /// reference owned by the caller. `provider` must keep the code behind
    /// the pointer alive.
    pub unsafe fn from_raw(
        raw: *mut IDeckLinkDiscovery,
        provider: Option<KeepAlive>,
    ) -> Result<Self> {
        let inner = ComPtr::from_raw(raw).ok_or(DeckLinkError::DiscoveryUnavailable)?;
        tracing::debug!(ptr = ?inner.as_raw(), "IDeckLinkDiscovery created");
        Ok(Self {
            inner,
            installed: AtomicBool::new(false),
            _provider: provider,
        })
    }

    pub fn as_raw(&self) -> *mut IDeckLinkDiscovery {
        self.inner.as_raw()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Registers `handler` for arrival/removal notifications.
    ///
    /// Notifications stop when the returned [`Registration`] is uninstalled or dropped.
    /// The driver usually reports devices that are already attached right away.
    pub fn install(&self, handler: Box<dyn DeviceNotification>) -> Result<Registration<'_>> {
        if self.installed.swap(true, Ordering::SeqCst) {
            return Err(DeckLinkError::AlreadyInstalled);
        }

        let callback = NotificationCallback::new(handler);
        let hr = unsafe {
            let vtbl: &IDeckLinkDiscoveryVtbl = self.inner.vtbl();
            (vtbl.install_device_notifications)(self.inner.as_raw(), callback.as_raw())
        };

        if hr.is_failure() {
            self.installed.store(false, Ordering::SeqCst);
            tracing::error!(%hr, "InstallDeviceNotifications failed");
            return Err(DeckLinkError::com(
                "IDeckLinkDiscovery::InstallDeviceNotifications",
                hr,
            ));
        }

        tracing::info!("device notifications installed");
        Ok(Registration {
            discovery: self,
            callback: Some(callback),
        })
    }

    fn uninstall_raw(&self) -> Result<()> {
        let hr = unsafe {
            let vtbl: &IDeckLinkDiscoveryVtbl = self.inner.vtbl();
            (vtbl.uninstall_device_notifications)(self.inner.as_raw())
        };
        self.installed.store(false, Ordering::SeqCst);
        if hr.is_failure() {
            return Err(DeckLinkError::com(
                "IDeckLinkDiscovery::UninstallDeviceNotifications",
                hr,
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("ptr", &self.inner.as_raw())
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// An installed notification callback. States: installed → uninstalled.
#[must_use = "device notifications are uninstalled when the registration is dropped"]
pub struct Registration<'a> {
    discovery: &'a Discovery,
    callback: Option<NotificationCallback>,
}

impl Registration<'_> {
    pub fn stats(&self) -> NotificationStats {
        self.callback
            .as_ref()
            .map(|cb| cb.state().registry.stats())
            .unwrap_or_default()
    }

    /// Devices currently attached, as seen through notifications so far.
    pub fn live_devices(&self) -> Vec<DeviceId> {
        self.callback
            .as_ref()
            .map(|cb| cb.state().registry.ids())
            .unwrap_or_default()
    }

    /// Stops notifications, releases every device still held and returns the final counters.
    pub fn uninstall(mut self) -> Result<NotificationStats> {
        self.finish()
    }

    fn finish(&mut self) -> Result<NotificationStats> {
        let Some(callback) = self.callback.take() else {
            return Ok(NotificationStats::default());
        };

        let result = self.discovery.uninstall_raw();

        let mut state = callback.state();
        let stats = state.registry.stats();
        let released = state.registry.clear();
        drop(state);
        if released > 0 {
            tracing::debug!(released, "released devices still attached at uninstall");
        }
        tracing::info!(?stats, "device notifications uninstalled");

        // 驱动若仍持有回调的引用，对象会继续存活，直到它 Release
        drop(callback);
        result.map(|_| stats)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!("uninstalling device notifications on drop: {e}");
        }
    }
}

impl fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("discovery", &self.discovery.as_raw())
            .field("callback", &self.callback)
            .finish()
    }
}
