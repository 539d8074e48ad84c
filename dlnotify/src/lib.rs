pub mod backend;
pub mod notifier;
pub mod report;

// Re-export 核心库，使用者只需依赖 dlnotify
pub use dlnotify_core;

#[cfg(feature = "simulation")]
pub use dlnotify_simulation;

/// 预置模块，用户可以通过 `use dlnotify::prelude::*;` 导入常用项
pub mod prelude {
    pub use crate::backend::create_driver;
    pub use crate::notifier::ChannelNotifier;
    pub use crate::report::{EventPrinter, OutputFormat};
    pub use dlnotify_core::prelude::*;
}
