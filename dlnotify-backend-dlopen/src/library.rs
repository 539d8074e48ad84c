use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
use libloading::Library;

use dlnotify_core::abi::IDeckLinkDiscovery;
use dlnotify_core::builder::DiscoveryConfig;
use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::{DeckLinkError, Result};

/// `IDeckLinkDiscovery* CreateDeckLinkDiscoveryInstance_000N(void)`
type FactoryFn = unsafe extern "C" fn() -> *mut IDeckLinkDiscovery;

/// 平台默认的 SDK 位置
pub fn default_library_paths() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Library/Frameworks/DeckLinkAPI.framework/DeckLinkAPI"),
            PathBuf::from("DeckLinkAPI.framework/DeckLinkAPI"),
        ]
    } else {
        vec![PathBuf::from("libDeckLinkAPI.so")]
    }
}

/// 已加载的 SDK 动态库
///
/// 驱动返回的接口对象的代码位于库中，因此库必须在所有接口释放之后才能卸载。
/// [`DeckLinkApi::create_discovery`] 会把库的引用交给 [`Discovery`] 保管。
#[derive(Debug, Clone)]
pub struct DeckLinkApi {
    library: Arc<Library>,
    factory: FactoryFn,
    path: PathBuf,
    symbol: String,
}

impl DeckLinkApi {
    pub fn load(config: &DiscoveryConfig) -> Result<Self> {
        let candidates = match &config.library_path {
            Some(path) => vec![path.clone()],
            None => default_library_paths(),
        };
        let (library, path) = open_first(&candidates)?;
        let (factory, symbol) = resolve_factory(&library, &config.factory_symbols)?;

        tracing::info!(path = %path.display(), %symbol, "DeckLink API loaded");
        Ok(Self {
            library: Arc::new(library),
            factory,
            path,
            symbol,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Calls the factory. A null result maps to `DiscoveryUnavailable`.
    pub fn create_discovery(&self) -> Result<Discovery> {
        let raw = unsafe { (self.factory)() };
        unsafe { Discovery::from_raw(raw, Some(Box::new(self.library.clone()))) }
    }
}

fn open_first(candidates: &[PathBuf]) -> Result<(Library, PathBuf)> {
    let mut last_error = String::from("no candidate paths");
    for path in candidates {
        // 与 SDK 自带的 dispatch 代码一致：立即解析全部符号，并对后续加载的库可见
        match unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) } {
            Ok(library) => return Ok((library.into(), path.clone())),
            Err(e) => {
                tracing::debug!(path = %path.display(), "dlopen failed: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(DeckLinkError::LibraryUnavailable {
        tried: join(candidates.iter().map(|p| p.display().to_string())),
        reason: last_error,
    })
}

fn resolve_factory(library: &Library, symbols: &[String]) -> Result<(FactoryFn, String)> {
    for symbol in symbols {
        if let Ok(factory) = unsafe { library.get::<FactoryFn>(symbol.as_bytes()) } {
            return Ok((*factory, symbol.clone()));
        }
        tracing::trace!(%symbol, "factory symbol not exported");
    }

    Err(DeckLinkError::EntryPointMissing {
        tried: join(symbols.iter().cloned()),
    })
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_lists_candidates() {
        let config = DiscoveryConfig::new().library_path("/nonexistent/libDeckLinkAPI.so");
        match DeckLinkApi::load(&config) {
            Err(DeckLinkError::LibraryUnavailable { tried, .. }) => {
                assert_eq!(tried, "/nonexistent/libDeckLinkAPI.so");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_without_factory_is_rejected() {
        // libc 一定存在，但不会导出 DeckLink 工厂函数
        let config = DiscoveryConfig::new()
            .library_path("libc.so.6")
            .factory_symbols(["CreateDeckLinkDiscoveryInstance_0003"]);
        match DeckLinkApi::load(&config) {
            Err(DeckLinkError::EntryPointMissing { tried }) => {
                assert_eq!(tried, "CreateDeckLinkDiscoveryInstance_0003");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn default_paths_are_platform_specific() {
        let paths = default_library_paths();
        assert!(!paths.is_empty());
        if cfg!(target_os = "linux") {
            assert_eq!(paths[0], PathBuf::from("libDeckLinkAPI.so"));
        }
    }
}
