//! Notification and event fan-out
//!
//! Decision code never talks to the user directly; it hands a [`Notice`] to
//! the [`EventBus`], which logs it and forwards it to every subscriber (the
//! WebSocket feed, tests).

use tokio::sync::broadcast;

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::protocol::{ControlEvent, Notice, NoticeVariant};

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ControlEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ControlEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Default => {
                tracing::info!(title = %notice.title, "{}", notice.description)
            }
            NoticeVariant::Warning | NoticeVariant::Destructive => {
                tracing::warn!(title = %notice.title, "{}", notice.description)
            }
        }
        self.publish(ControlEvent::Notice(notice));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every notice currently queued on a receiver
#[cfg(test)]
pub(crate) fn drain_notices(rx: &mut broadcast::Receiver<ControlEvent>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ControlEvent::Notice(n) = event {
            notices.push(n);
        }
    }
    notices
}
