use std::fmt;

use crate::device::DeviceInfo;
use crate::traits::{ArrivalStatus, RemovalStatus};

/// Kind of change reported to closure handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Arrived(ArrivalStatus),
    Removed(RemovalStatus),
}

/// 设备事件快照 (可跨线程传递、可序列化)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize),
    serde(tag = "event", rename_all = "snake_case")
)]
pub enum DeviceEvent {
    Arrived {
        device: DeviceInfo,
        /// 指针已在设备表中
        duplicate: bool,
    },
    Removed {
        device: DeviceInfo,
        /// 之前到达过 ("added earlier")
        tracked: bool,
    },
}

impl DeviceEvent {
    pub fn arrived(device: DeviceInfo, status: ArrivalStatus) -> Self {
        DeviceEvent::Arrived {
            device,
            duplicate: status == ArrivalStatus::Duplicate,
        }
    }

    pub fn removed(device: DeviceInfo, status: RemovalStatus) -> Self {
        DeviceEvent::Removed {
            device,
            tracked: status == RemovalStatus::Tracked,
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        match self {
            DeviceEvent::Arrived { device, .. } | DeviceEvent::Removed { device, .. } => device,
        }
    }

    /// One JSON object, no trailing newline.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::Arrived { device, duplicate } => {
                write!(f, "device arrived: {device}")?;
                if *duplicate {
                    write!(f, " (already tracked)")?;
                }
                Ok(())
            }
            DeviceEvent::Removed { device, tracked } => {
                let origin = if *tracked {
                    "added earlier"
                } else {
                    "unknown pointer"
                };
                write!(f, "device removed: {device} ({origin})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;

    fn info() -> DeviceInfo {
        DeviceInfo {
            id: DeviceId(0xabc0),
            model_name: Some("DeckLink Mini Monitor".into()),
            display_name: Some("DeckLink Mini Monitor".into()),
        }
    }

    #[test]
    fn removal_text_names_origin() {
        let known = DeviceEvent::removed(info(), RemovalStatus::Tracked);
        assert_eq!(
            known.to_string(),
            "device removed: IDeckLink pointer = 0xabc0 [DeckLink Mini Monitor] (added earlier)"
        );

        let stray =
            DeviceEvent::removed(DeviceInfo::unnamed(DeviceId(0x1)), RemovalStatus::Unknown);
        assert_eq!(
            stray.to_string(),
            "device removed: IDeckLink pointer = 0x1 (unknown pointer)"
        );
    }

    #[test]
    fn duplicate_arrival_is_marked() {
        let event = DeviceEvent::arrived(info(), ArrivalStatus::Duplicate);
        assert!(event.to_string().ends_with("(already tracked)"));
        assert_eq!(event.device().id, DeviceId(0xabc0));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn json_is_tagged() -> anyhow::Result<()> {
        let event = DeviceEvent::arrived(info(), ArrivalStatus::New);
        let value: serde_json::Value = serde_json::from_str(&event.to_json()?)?;
        assert_eq!(value["event"], "arrived");
        assert_eq!(value["duplicate"], false);
        assert_eq!(value["device"]["id"], "0xabc0");
        assert_eq!(value["device"]["model_name"], "DeckLink Mini Monitor");
        Ok(())
    }
}
