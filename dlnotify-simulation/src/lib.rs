//! 仿真后端：在进程内实现与 DeckLink 驱动相同二进制布局的发现服务
//!
//! 用于没有采集卡的机器上运行测试和演示 (`dlnotify --simulate N`)。

mod bus;
mod objects;

pub use bus::{SimulatedBus, SimulatedDevice, DEMO_MODELS};

use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::Result;
use dlnotify_core::traits::Driver;

#[derive(Debug, Clone, Default)]
pub struct SimulationDriver {
    bus: SimulatedBus,
}

impl SimulationDriver {
    pub fn new(bus: SimulatedBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &SimulatedBus {
        &self.bus
    }
}

impl Driver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn create_discovery(&self) -> Result<Discovery> {
        self.bus.create_discovery()
    }
}
