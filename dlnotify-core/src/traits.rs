use crate::device::DeckLink;
use crate::discovery::Discovery;
use crate::error::Result;

/// 到达事件相对于设备表的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    /// 新设备，已加入设备表并持有一个引用
    New,
    /// 同一指针再次到达，设备表不再重复 AddRef
    Duplicate,
}

/// 移除事件相对于设备表的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStatus {
    /// 之前到达过 ("added earlier")，其引用已释放
    Tracked,
    /// 从未见过的指针 ("unknown pointer")
    Unknown,
}

/// 1. 用户回调：设备热插拔通知
///
/// 回调在驱动的通知线程上执行，应尽快返回。
/// 句柄只在调用期间借出；需要保留时 `clone()` 即可 (会 AddRef)。
pub trait DeviceNotification: Send {
    fn device_arrived(&mut self, device: &DeckLink, status: ArrivalStatus);
    fn device_removed(&mut self, device: &DeckLink, status: RemovalStatus);
}

impl<F> DeviceNotification for F
where
    F: FnMut(&DeckLink, crate::event::Change) + Send,
{
    fn device_arrived(&mut self, device: &DeckLink, status: ArrivalStatus) {
        self(device, crate::event::Change::Arrived(status))
    }

    fn device_removed(&mut self, device: &DeckLink, status: RemovalStatus) {
        self(device, crate::event::Change::Removed(status))
    }
}

/// 2. 驱动入口：获取发现服务
///
/// 每个平台后端只负责“如何拿到 IDeckLinkDiscovery 指针”，
/// 回调对象与设备表由 core 统一实现。
pub trait Driver: Send + Sync {
    /// 后端类型标识 (e.g. "dlopen", "COM", "simulation")
    fn name(&self) -> &'static str;

    fn create_discovery(&self) -> Result<Discovery>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_discovery(&self) -> Result<Discovery> {
        (**self).create_discovery()
    }
}

impl<D: Driver + ?Sized> Driver for std::sync::Arc<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_discovery(&self) -> Result<Discovery> {
        (**self).create_discovery()
    }
}
