#![cfg(target_os = "windows")]

pub mod apartment;
pub mod factory;

use dlnotify_core::discovery::Discovery;
use dlnotify_core::error::Result;
use dlnotify_core::traits::Driver;

#[derive(Debug, Clone)]
pub struct ComDriver;

impl Default for ComDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ComDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for ComDriver {
    fn name(&self) -> &'static str {
        "COM"
    }

    fn create_discovery(&self) -> Result<Discovery> {
        factory::create_discovery()
    }
}
