// MIT License - Copyright (c) 2026 Peter Wright

//! In-memory state table shared by the decoders and the public API.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::RwLock;
use tracing::debug;

use crate::event::{EventSender, PanelEvent};
use crate::storage::StateStorage;

/// Alarm state of a section, as exposed to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Disarmed,
    ArmedAway,
    ArmedNight,
    /// Exit delay running after an arm command.
    Arming,
    /// Entry delay running after a detector tripped in an armed section.
    Pending,
    Triggered,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Disarmed => "disarmed",
            AlarmState::ArmedAway => "armed_away",
            AlarmState::ArmedNight => "armed_night",
            AlarmState::Arming => "arming",
            AlarmState::Pending => "pending",
            AlarmState::Triggered => "triggered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "disarmed" => Some(AlarmState::Disarmed),
            "armed_away" => Some(AlarmState::ArmedAway),
            "armed_night" => Some(AlarmState::ArmedNight),
            "arming" => Some(AlarmState::Arming),
            "pending" => Some(AlarmState::Pending),
            "triggered" => Some(AlarmState::Triggered),
            _ => None,
        }
    }

    /// An alarm is in progress or imminent. While any section is in such a
    /// state the keepalive loop must not send status-refresh requests, only
    /// plain heartbeats.
    pub fn is_in_alarm(&self) -> bool {
        matches!(self, AlarmState::Triggered | AlarmState::Pending)
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On/off state of a sensor or problem flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryState {
    On,
    Off,
}

impl BinaryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryState::On => "on",
            BinaryState::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(BinaryState::On),
            "off" => Some(BinaryState::Off),
            _ => None,
        }
    }

    pub fn from_bool(on: bool) -> Self {
        if on {
            BinaryState::On
        } else {
            BinaryState::Off
        }
    }
}

impl fmt::Display for BinaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a tracked entity. Sections carry an [`AlarmState`], everything
/// else (sensors, problem flags, the LAN connection) a [`BinaryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateValue {
    Alarm(AlarmState),
    Binary(BinaryState),
}

impl StateValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateValue::Alarm(a) => a.as_str(),
            StateValue::Binary(b) => b.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if let Some(b) = BinaryState::parse(s) {
            return Some(StateValue::Binary(b));
        }
        AlarmState::parse(s).map(StateValue::Alarm)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Serialized as the plain string form so the stored-states file stays
// readable and editable by hand.
impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StateValue::parse(&s)
            .ok_or_else(|| D::Error::custom(format!("unknown state value: {s}")))
    }
}

/// Keyed state table. Every write goes through [`StateStore::update`], which
/// suppresses no-op transitions, broadcasts the change and optionally hands
/// it to the stored-states file.
pub struct StateStore {
    states: RwLock<HashMap<String, StateValue>>,
    event_tx: EventSender,
    storage: Option<Arc<StateStorage>>,
}

impl StateStore {
    pub fn new(event_tx: EventSender, storage: Option<Arc<StateStorage>>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            event_tx,
            storage,
        }
    }

    /// Set a state and notify subscribers if it actually changed. Returns
    /// whether a transition happened.
    pub async fn update(&self, id: &str, value: StateValue, persist: bool) -> bool {
        {
            let mut states = self.states.write().await;
            if states.get(id) == Some(&value) {
                return false;
            }
            states.insert(id.to_string(), value);
        }

        debug!(id, value = %value, "state changed");

        // Errors just mean no subscriber is listening right now
        let _ = self.event_tx.send(PanelEvent::StateChanged {
            id: id.to_string(),
            value,
        });

        if persist {
            if let Some(storage) = &self.storage {
                storage.store(id, value);
            }
        }

        true
    }

    /// Seed a state without notifying, and only if nothing (for example a
    /// persisted value) already set it.
    pub async fn set_initial(&self, id: &str, value: StateValue) {
        let mut states = self.states.write().await;
        states.entry(id.to_string()).or_insert(value);
    }

    pub async fn get(&self, id: &str) -> Option<StateValue> {
        self.states.read().await.get(id).copied()
    }

    pub async fn snapshot(&self) -> HashMap<String, StateValue> {
        self.states.read().await.clone()
    }

    /// Whether any section has an alarm in progress or imminent.
    pub async fn any_alarm_active(&self) -> bool {
        self.states
            .read()
            .await
            .values()
            .any(|v| matches!(v, StateValue::Alarm(a) if a.is_in_alarm()))
    }

    /// Load previously persisted values into the table. Called once at
    /// startup, before detection seeds defaults via `set_initial`.
    pub async fn load_persisted(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let stored = storage.stored_states();
        if stored.is_empty() {
            return;
        }

        let mut states = self.states.write().await;
        for (id, value) in stored {
            debug!(id, value = %value, "restored persisted state");
            states.insert(id, value);
        }
    }
}
