use std::fmt;

/// 通知计数
///
/// 由回调对象在每次到达/移除时更新，可随时通过 `Registration::stats()` 取快照，
/// 卸载时作为最终结果返回。
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationStats {
    /// 新设备到达次数
    pub arrivals: u64,

    /// 已在设备表中的指针再次到达
    pub duplicate_arrivals: u64,

    /// 移除了之前到达过的设备
    pub removals: u64,

    /// 移除了从未见过的指针
    pub unknown_removals: u64,

    /// 当前仍持有引用的设备数
    pub live_devices: usize,

    /// 用户回调 panic 的次数 (已被拦截，不会穿越 FFI 边界)
    pub handler_panics: u64,
}

impl fmt::Debug for NotificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationStats")
            .field("arrived", &self.arrivals)
            .field("dup", &self.duplicate_arrivals)
            .field("removed", &self.removals)
            .field("unknown", &self.unknown_removals)
            .field("live", &self.live_devices)
            .finish()
    }
}

impl fmt::Display for NotificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} arrived, {} removed, {} unknown removals, {} still attached",
            self.arrivals, self.removals, self.unknown_removals, self.live_devices
        )
    }
}

/// 简单的状态评估
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionHealth {
    Clean,
    /// The driver reported pointers it never announced, or re-announced one.
    Inconsistent,
    /// A user handler panicked at least once.
    HandlerFault,
}

impl fmt::Display for SessionHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionHealth::Clean => "clean",
            SessionHealth::Inconsistent => "inconsistent",
            SessionHealth::HandlerFault => "handler fault",
        })
    }
}

impl NotificationStats {
    pub fn assess(&self) -> SessionHealth {
        if self.handler_panics > 0 {
            return SessionHealth::HandlerFault;
        }
        if self.unknown_removals > 0 || self.duplicate_arrivals > 0 {
            return SessionHealth::Inconsistent;
        }
        SessionHealth::Clean
    }
}
