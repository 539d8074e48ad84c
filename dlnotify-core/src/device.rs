use std::fmt;

use crate::abi::{IDeckLink, IDeckLinkVtbl};
use crate::com::ComPtr;
use crate::error::{DeckLinkError, Result};
use crate::strings::{self, RawSdkString};

/// 设备标识：`IDeckLink` 接口指针的地址
///
/// SDK 在设备存续期间始终用同一个指针报告它，
/// 因此地址可以作为到达/移除事件之间的配对键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for DeviceId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Handle to one attached DeckLink device. Holds a reference for as long as it lives.
#[derive(Clone, PartialEq, Eq)]
pub struct DeckLink {
    inner: ComPtr<IDeckLink>,
}

impl DeckLink {
    pub fn from_com(inner: ComPtr<IDeckLink>) -> Self {
        Self { inner }
    }

    /// # Safety
    /// `ptr` must be null or a live `IDeckLink` pointer lent by the SDK.
    pub unsafe fn from_borrowed(ptr: *mut IDeckLink) -> Option<Self> {
        ComPtr::from_borrowed(ptr).map(Self::from_com)
    }

    pub fn id(&self) -> DeviceId {
        DeviceId(self.inner.addr())
    }

    pub fn as_raw(&self) -> *mut IDeckLink {
        self.inner.as_raw()
    }

    pub fn model_name(&self) -> Result<String> {
        self.read_string("IDeckLink::GetModelName", |vtbl| vtbl.get_model_name)
    }

    pub fn display_name(&self) -> Result<String> {
        self.read_string("IDeckLink::GetDisplayName", |vtbl| vtbl.get_display_name)
    }

    fn read_string(
        &self,
        call: &'static str,
        method: impl Fn(
            &IDeckLinkVtbl,
        ) -> unsafe extern "system" fn(*mut IDeckLink, *mut RawSdkString) -> crate::HResult,
    ) -> Result<String> {
        let mut raw: RawSdkString = std::ptr::null();
        let hr = unsafe {
            let vtbl: &IDeckLinkVtbl = self.inner.vtbl();
            method(vtbl)(self.inner.as_raw(), &mut raw)
        };
        if hr.is_failure() {
            return Err(DeckLinkError::com(call, hr));
        }
        unsafe { strings::take(raw) }.ok_or(DeckLinkError::com(call, crate::HResult::E_POINTER))
    }
}

impl fmt::Debug for DeckLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeckLink").field(&self.id()).finish()
    }
}

/// 设备基本信息快照
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct DeviceInfo {
    pub id: DeviceId,

    /// e.g. "DeckLink Mini Recorder"
    pub model_name: Option<String>,

    /// 对用户友好的显示名称，多路设备会带上子设备编号
    pub display_name: Option<String>,
}

impl DeviceInfo {
    /// Reads the names from the device. Failures leave the field empty.
    pub fn query(device: &DeckLink) -> Self {
        let model_name = device
            .model_name()
            .map_err(|e| tracing::debug!(device = %device.id(), "model name unavailable: {e}"))
            .ok();
        let display_name = device
            .display_name()
            .map_err(|e| tracing::debug!(device = %device.id(), "display name unavailable: {e}"))
            .ok();

        Self {
            id: device.id(),
            model_name,
            display_name,
        }
    }

    pub fn unnamed(id: DeviceId) -> Self {
        Self {
            id,
            model_name: None,
            display_name: None,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IDeckLink pointer = {}", self.id)?;
        match (&self.model_name, &self.display_name) {
            (Some(model), Some(name)) if model != name => write!(f, " [{name}, model {model}]"),
            (_, Some(name)) => write!(f, " [{name}]"),
            (Some(model), None) => write!(f, " [model {model}]"),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDevice;

    #[test]
    fn id_is_hex_pointer() {
        let id = DeviceId(0x7f00_dead_beef);
        assert_eq!(id.to_string(), "0x7f00deadbeef");
    }

    #[test]
    fn query_reads_both_names() {
        let fake = FakeDevice::new("DeckLink Duo 2", "DeckLink Duo (2)");
        let device = fake.handle();
        let info = DeviceInfo::query(&device);
        assert_eq!(info.id, device.id());
        assert_eq!(info.model_name.as_deref(), Some("DeckLink Duo 2"));
        assert_eq!(info.display_name.as_deref(), Some("DeckLink Duo (2)"));
        assert_eq!(
            info.to_string(),
            format!("IDeckLink pointer = {} [DeckLink Duo (2), model DeckLink Duo 2]", device.id())
        );
    }

    #[test]
    fn handle_clone_tracks_references() {
        let fake = FakeDevice::new("Intensity Pro 4K", "Intensity Pro 4K");
        let device = fake.handle();
        assert_eq!(fake.refs(), 2);
        let second = device.clone();
        assert_eq!(fake.refs(), 3);
        drop(second);
        drop(device);
        assert_eq!(fake.refs(), 1);
    }

    #[test]
    fn display_without_names() {
        let info = DeviceInfo::unnamed(DeviceId(0x10));
        assert_eq!(info.to_string(), "IDeckLink pointer = 0x10");
    }
}
