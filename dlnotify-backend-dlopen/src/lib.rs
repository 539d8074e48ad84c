#![cfg(unix)]

pub mod library;

use dlnotify_core::builder::DiscoveryConfig;
use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::Result;
use dlnotify_core::traits::Driver;
use std::sync::Mutex;

pub use library::{default_library_paths, DeckLinkApi};

/// Linux / macOS 驱动
///
/// 第一次创建发现服务时加载 SDK 动态库，之后复用同一个库句柄。
#[derive(Debug, Default)]
pub struct DlopenDriver {
    config: DiscoveryConfig,
    api: Mutex<Option<DeckLinkApi>>,
}

impl DlopenDriver {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            api: Mutex::new(None),
        }
    }

    /// Loads the SDK (once) and returns the handle.
    pub fn api(&self) -> Result<DeckLinkApi> {
        let mut api = self.api.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(api) = api.as_ref() {
            return Ok(api.clone());
        }
        let loaded = DeckLinkApi::load(&self.config)?;
        *api = Some(loaded.clone());
        Ok(loaded)
    }
}

impl Driver for DlopenDriver {
    fn name(&self) -> &'static str {
        "dlopen"
    }

    fn create_discovery(&self) -> Result<Discovery> {
        self.api()?.create_discovery()
    }
}
