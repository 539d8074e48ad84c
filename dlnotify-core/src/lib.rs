// 开启一些 Clippy 检查，保证代码质量
#![warn(missing_debug_implementations, rust_2018_idioms)]

// 模块定义
pub mod abi;
pub mod builder;
pub mod com;
pub mod device;
pub mod discovery;
pub mod error;
pub mod event;
pub mod guid;
pub mod hresult;
pub mod registry;
pub mod strings;
pub mod telemetry;
pub mod traits;

mod callback;

#[cfg(test)]
mod test_support;

pub use hresult::HResult;

// 方便用户使用的 Prelude
pub mod prelude {
    pub use crate::builder::DiscoveryConfig;
    pub use crate::device::{DeckLink, DeviceId, DeviceInfo};
    pub use crate::discovery::{Discovery, Registration};
    pub use crate::error::{DeckLinkError, Result};
    pub use crate::event::{Change, DeviceEvent};
    pub use crate::hresult::HResult;
    pub use crate::telemetry::{NotificationStats, SessionHealth};
    pub use crate::traits::{ArrivalStatus, DeviceNotification, Driver, RemovalStatus};
}

// 版本与构建信息常量
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
