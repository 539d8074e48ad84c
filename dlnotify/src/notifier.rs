use crossbeam_channel::{unbounded, Receiver, Sender};

use dlnotify_core::device::{DeckLink, DeviceInfo};
use dlnotify_core::event::DeviceEvent;
use dlnotify_core::traits::{ArrivalStatus, DeviceNotification, RemovalStatus};

/// 把驱动线程上的通知转发到 channel
///
/// 使用无界通道：回调永远不会阻塞驱动的通知线程。
/// 接收端被丢弃后，后续事件直接丢弃。
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<DeviceEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, Receiver<DeviceEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    fn forward(&self, event: DeviceEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

impl DeviceNotification for ChannelNotifier {
    fn device_arrived(&mut self, device: &DeckLink, status: ArrivalStatus) {
        let info = DeviceInfo::query(device);
        tracing::debug!(device = %info.id, ?status, "device arrived");
        self.forward(DeviceEvent::arrived(info, status));
    }

    fn device_removed(&mut self, device: &DeckLink, status: RemovalStatus) {
        // 移除后驱动可能已拿不到名字，query 失败时字段为空
        let info = DeviceInfo::query(device);
        tracing::debug!(device = %info.id, ?status, "device removed");
        self.forward(DeviceEvent::removed(info, status));
    }
}

#[cfg(all(test, feature = "simulation"))]
mod tests {
    use super::*;
    use dlnotify_simulation::SimulatedBus;

    #[test]
    fn forwards_hotplug_in_order() -> anyhow::Result<()> {
        let bus = SimulatedBus::new();
        let first = bus.plug("DeckLink Duo 2", "DeckLink Duo 2 (1)");

        let discovery = bus.create_discovery()?;
        let (notifier, events) = ChannelNotifier::new();
        let registration = discovery.install(Box::new(notifier))?;

        let second = bus.plug("UltraStudio Recorder 3G", "UltraStudio Recorder 3G");
        bus.unplug(&first);

        let received: Vec<DeviceEvent> = events.try_iter().collect();
        assert_eq!(received.len(), 3);
        let expected = DeviceEvent::Arrived {
            device: DeviceInfo {
                id: first.id(),
                model_name: Some("DeckLink Duo 2".into()),
                display_name: Some("DeckLink Duo 2 (1)".into()),
            },
            duplicate: false,
        };
        assert_eq!(received[0], expected);
        assert_eq!(received[1].device().id, second.id());
        assert!(matches!(received[2], DeviceEvent::Removed { tracked: true, .. }));

        let stats = registration.uninstall()?;
        assert_eq!(stats.live_devices, 1);
        Ok(())
    }

    #[test]
    fn dropped_receiver_does_not_fault_the_callback() -> anyhow::Result<()> {
        let bus = SimulatedBus::new();
        let discovery = bus.create_discovery()?;
        let (notifier, events) = ChannelNotifier::new();
        drop(events);

        let registration = discovery.install(Box::new(notifier))?;
        bus.plug("Intensity Pro 4K", "Intensity Pro 4K");

        let stats = registration.stats();
        assert_eq!(stats.arrivals, 1);
        assert_eq!(stats.handler_panics, 0);
        Ok(())
    }
}
