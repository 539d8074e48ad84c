use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use dlnotify_core::abi::IDeckLinkDeviceNotificationCallback;
use dlnotify_core::com::ComPtr;
use dlnotify_core::device::{DeckLink, DeviceId};
use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::Result;
use dlnotify_core::HResult;

use crate::objects;

/// Model names cycled through by [`SimulatedBus::plug_demo_devices`].
pub const DEMO_MODELS: &[&str] = &[
    "DeckLink Mini Recorder",
    "DeckLink Duo 2",
    "UltraStudio 4K Mini",
    "Intensity Pro 4K",
    "DeckLink 8K Pro",
];

type Listener = (u64, ComPtr<IDeckLinkDeviceNotificationCallback>);

#[derive(Default)]
struct BusState {
    devices: Vec<DeckLink>,
    listeners: Vec<Listener>,
    next_discovery: u64,
    fail_next_install: Option<HResult>,
}

/// 模拟的主机总线
///
/// 设备插拔会同步地 (在调用线程上) 通知所有已安装的回调，
/// 这与真实驱动在其通知线程上回调的语义一致，只是线程不同。
#[derive(Clone, Default)]
pub struct SimulatedBus {
    inner: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates a new discovery instance attached to this bus.
    pub fn create_discovery(&self) -> Result<Discovery> {
        let id = {
            let mut state = self.state();
            state.next_discovery += 1;
            state.next_discovery
        };
        let raw = objects::new_discovery(self.clone(), id);
        unsafe { Discovery::from_raw(raw, None) }
    }

    /// Attaches a new device and announces it to every installed callback.
    pub fn plug(&self, model: &str, display: &str) -> SimulatedDevice {
        let device = SimulatedDevice {
            handle: DeckLink::from_com(objects::new_device(model, display)),
        };
        let listeners = {
            let mut state = self.state();
            state.devices.push(device.handle.clone());
            snapshot(&state.listeners)
        };
        tracing::debug!(device = %device.id(), model, "simulated device plugged");
        announce_arrival(&listeners, &device.handle);
        device
    }

    /// Plugs `count` devices with demo model names.
    pub fn plug_demo_devices(&self, count: usize) -> Vec<SimulatedDevice> {
        (0..count)
            .map(|i| {
                let model = DEMO_MODELS[i % DEMO_MODELS.len()];
                let display = format!("{model} ({})", i + 1);
                self.plug(model, &display)
            })
            .collect()
    }

    /// Detaches the device and announces the removal. Returns `false` if it was not attached.
    pub fn unplug(&self, device: &SimulatedDevice) -> bool {
        let (removed, listeners) = {
            let mut state = self.state();
            let position = state.devices.iter().position(|d| d.id() == device.id());
            let removed = position.map(|i| state.devices.remove(i));
            (removed, snapshot(&state.listeners))
        };
        let Some(removed) = removed else {
            return false;
        };
        tracing::debug!(device = %removed.id(), "simulated device unplugged");
        announce_removal(&listeners, &removed);
        true
    }

    /// Announces the removal of a device that was never announced as arrived.
    pub fn announce_stray_removal(&self, model: &str) -> DeviceId {
        let stray = DeckLink::from_com(objects::new_device(model, model));
        let listeners = snapshot(&self.state().listeners);
        announce_removal(&listeners, &stray);
        stray.id()
    }

    /// Announces an already attached device a second time.
    pub fn repeat_arrival(&self, device: &SimulatedDevice) {
        let listeners = snapshot(&self.state().listeners);
        announce_arrival(&listeners, &device.handle);
    }

    /// Makes the next `InstallDeviceNotifications` call fail with `hr`.
    pub fn fail_next_install(&self, hr: HResult) {
        self.state().fail_next_install = Some(hr);
    }

    pub fn attached_devices(&self) -> usize {
        self.state().devices.len()
    }

    pub fn installed_callbacks(&self) -> usize {
        self.state().listeners.len()
    }

    pub(crate) fn attach(
        &self,
        discovery: u64,
        callback: ComPtr<IDeckLinkDeviceNotificationCallback>,
    ) -> HResult {
        let devices = {
            let mut state = self.state();
            if let Some(hr) = state.fail_next_install.take() {
                return hr;
            }
            if state.listeners.iter().any(|(id, _)| *id == discovery) {
                return HResult::E_FAIL;
            }
            state.listeners.push((discovery, callback.clone()));
            state.devices.clone()
        };

        // 安装时先报告已经连接的设备
        let listener = [(discovery, callback)];
        for device in &devices {
            announce_arrival(&listener, device);
        }
        HResult::S_OK
    }

    pub(crate) fn detach(&self, discovery: u64) {
        let removed: Vec<Listener> = {
            let mut state = self.state();
            let (removed, kept) = std::mem::take(&mut state.listeners)
                .into_iter()
                .partition(|(id, _)| *id == discovery);
            state.listeners = kept;
            removed
        };
        // 回调引用在锁外释放
        drop(removed);
    }
}

impl fmt::Debug for SimulatedBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SimulatedBus")
            .field("devices", &state.devices.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

fn snapshot(listeners: &[Listener]) -> Vec<Listener> {
    listeners.to_vec()
}

fn announce_arrival(listeners: &[Listener], device: &DeckLink) {
    for (_, callback) in listeners {
        let hr = unsafe {
            let vtbl = &*(*callback.as_raw()).vtbl;
            (vtbl.device_arrived)(callback.as_raw(), device.as_raw())
        };
        if hr.is_failure() {
            tracing::warn!(%hr, device = %device.id(), "DeckLinkDeviceArrived returned failure");
        }
    }
}

fn announce_removal(listeners: &[Listener], device: &DeckLink) {
    for (_, callback) in listeners {
        let hr = unsafe {
            let vtbl = &*(*callback.as_raw()).vtbl;
            (vtbl.device_removed)(callback.as_raw(), device.as_raw())
        };
        if hr.is_failure() {
            tracing::warn!(%hr, device = %device.id(), "DeckLinkDeviceRemoved returned failure");
        }
    }
}

/// A device plugged into a [`SimulatedBus`]. Keeps the device object alive.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    handle: DeckLink,
}

impl SimulatedDevice {
    pub fn id(&self) -> DeviceId {
        self.handle.id()
    }

    pub fn handle(&self) -> &DeckLink {
        &self.handle
    }

    /// Current reference count of the underlying object.
    pub fn ref_count(&self) -> u32 {
        unsafe { objects::device_refs(self.handle.as_raw()) }
    }
}
