// MIT License - Copyright (c) 2026 Peter Wright

use crate::state::StateValue;

/// All events that can be emitted by the panel.
///
/// Users subscribe via `panel.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<PanelEvent>`.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// A tracked entity changed state. `id` is a stable string key such as
    /// `section_1`, `device_sensor_3` or `lan`; the same key is returned by
    /// `JablotronPanel::states()`.
    StateChanged { id: String, value: StateValue },
    /// The serial line went quiet or recovered. Emitted once per transition,
    /// not per empty read.
    AvailabilityChanged { available: bool },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
