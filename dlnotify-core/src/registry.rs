use std::collections::HashMap;

use crate::device::{DeckLink, DeviceId};
use crate::telemetry::NotificationStats;
use crate::traits::{ArrivalStatus, RemovalStatus};

/// 活动设备表
///
/// 到达的设备持有一个引用 (AddRef)，移除时释放 (Release)。
/// 以接口指针地址为键，同一指针重复到达不会重复持有引用。
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, DeckLink>,
    stats: NotificationStats,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrived(&mut self, device: &DeckLink) -> ArrivalStatus {
        let status = if self.devices.contains_key(&device.id()) {
            self.stats.duplicate_arrivals += 1;
            ArrivalStatus::Duplicate
        } else {
            self.devices.insert(device.id(), device.clone());
            self.stats.arrivals += 1;
            ArrivalStatus::New
        };
        self.stats.live_devices = self.devices.len();
        status
    }

    /// Forgets the device. The tracked handle is dropped (released) here.
    pub fn removed(&mut self, id: DeviceId) -> RemovalStatus {
        let status = match self.devices.remove(&id) {
            Some(_released) => {
                self.stats.removals += 1;
                RemovalStatus::Tracked
            }
            None => {
                self.stats.unknown_removals += 1;
                RemovalStatus::Unknown
            }
        };
        self.stats.live_devices = self.devices.len();
        status
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Sorted ids of the devices currently held.
    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.devices.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn stats(&self) -> NotificationStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut NotificationStats {
        &mut self.stats
    }

    /// Releases every device still held and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let n = self.devices.len();
        self.devices.clear();
        self.stats.live_devices = 0;
        n
    }
}
