use std::path::PathBuf;

/// 工厂函数符号，新版本在前
///
/// 后缀是 SDK 的 ABI 版本号，不同版本的驱动导出不同的名字。
pub const DEFAULT_FACTORY_SYMBOLS: &[&str] = &[
    "CreateDeckLinkDiscoveryInstance_0003",
    "CreateDeckLinkDiscoveryInstance_0002",
    "CreateDeckLinkDiscoveryInstance_0001",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub library_path: Option<PathBuf>, // 为空时使用平台默认位置
    pub factory_symbols: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self {
            library_path: None,
            factory_symbols: DEFAULT_FACTORY_SYMBOLS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// 指定 SDK 动态库路径 (Linux/macOS)，覆盖默认搜索位置
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// 替换工厂函数符号列表，按顺序尝试
    pub fn factory_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        if !symbols.is_empty() {
            self.factory_symbols = symbols;
        }
        self
    }
}
