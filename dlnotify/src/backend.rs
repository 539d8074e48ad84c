use dlnotify_core::builder::DiscoveryConfig;
use dlnotify_core::error::{DeckLinkError, Result};
use dlnotify_core::traits::Driver;

/// 创建驱动实例的工厂函数
#[allow(unreachable_code)]
pub fn create_driver(config: &DiscoveryConfig) -> Result<Box<dyn Driver>> {
    #[cfg(all(feature = "unix-dlopen", unix))]
    {
        return Ok(Box::new(dlnotify_backend_dlopen::DlopenDriver::new(
            config.clone(),
        )));
    }

    #[cfg(all(feature = "windows-com", target_os = "windows"))]
    {
        if config.library_path.is_some() {
            tracing::warn!("library path is ignored by the COM backend");
        }
        return Ok(Box::new(dlnotify_backend_com::ComDriver::new()));
    }

    // 如果没有匹配的后端，返回错误
    let _ = config;
    Err(DeckLinkError::BackendUnavailable)
}

/// In-process bus with `devices` demo cards already attached.
///
/// With `install_failure` set, the first `InstallDeviceNotifications` call
/// returns that code.
#[cfg(feature = "simulation")]
pub fn create_simulated_driver(
    devices: usize,
    install_failure: Option<dlnotify_core::HResult>,
) -> Box<dyn Driver> {
    let bus = dlnotify_simulation::SimulatedBus::new();
    bus.plug_demo_devices(devices);
    if let Some(hr) = install_failure {
        bus.fail_next_install(hr);
    }
    Box::new(dlnotify_simulation::SimulationDriver::new(bus))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "unix-dlopen", unix))]
    #[test]
    fn unix_uses_dynamic_loading() -> anyhow::Result<()> {
        let driver = create_driver(&DiscoveryConfig::new())?;
        assert_eq!(driver.name(), "dlopen");
        Ok(())
    }

    #[cfg(feature = "simulation")]
    #[test]
    fn simulated_driver_replays_demo_devices() -> anyhow::Result<()> {
        use dlnotify_core::prelude::{Change, DeckLink};

        let driver = create_simulated_driver(2, None);
        assert_eq!(driver.name(), "simulation");

        let discovery = driver.create_discovery()?;
        let ignore = |_: &DeckLink, _: Change| {};
        let registration = discovery.install(Box::new(ignore))?;
        assert_eq!(registration.live_devices().len(), 2);
        Ok(())
    }

    #[cfg(feature = "simulation")]
    #[test]
    fn simulated_install_failure_carries_hresult() -> anyhow::Result<()> {
        use dlnotify_core::prelude::{Change, DeckLink, HResult};

        let driver = create_simulated_driver(1, Some(HResult::E_ACCESSDENIED));
        let discovery = driver.create_discovery()?;
        let ignore = |_: &DeckLink, _: Change| {};
        let err = discovery.install(Box::new(ignore)).unwrap_err();
        assert_eq!(err.hresult(), Some(HResult::E_ACCESSDENIED));
        assert!(err
            .to_string()
            .starts_with("IDeckLinkDiscovery::InstallDeviceNotifications failed. HRESULT=0x"));
        Ok(())
    }
}
