#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    use std::time::Duration;

    use dlnotify_backend_dlopen::DlopenDriver;
    use dlnotify_core::prelude::*;

    // 1. 初始化日志，以便看到加载了哪个库和符号
    tracing_subscriber::fmt::init();

    println!("=== dlnotify dlopen backend demo ===");

    let driver = DlopenDriver::new(DiscoveryConfig::new());
    let api = driver.api()?;
    println!("Loaded {} ({})", api.path().display(), api.symbol());

    // 2. 安装回调，插拔设备观察输出
    let discovery = driver.create_discovery()?;
    let registration = discovery.install(Box::new(|device: &DeckLink, change: Change| {
        println!("{change:?}: {}", DeviceInfo::query(device));
    }))?;

    println!("Watching for 30 seconds...");
    std::thread::sleep(Duration::from_secs(30));

    let stats = registration.uninstall()?;
    println!("{stats}");
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    println!("This example only runs on Linux and macOS.");
}
