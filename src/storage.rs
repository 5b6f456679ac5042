// MIT License - Copyright (c) 2026 Peter Wright

//! Persistence for states the central unit does not replay after a restart
//! (problem flags and the LAN connection state).
//!
//! The file is JSON keyed by serial port, so several bridges can share one
//! file. Writes are debounced: `store` only marks the document dirty and a
//! background task flushes it shortly after, collapsing bursts of changes
//! into a single write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::state::StateValue;

const STORAGE_VERSION: u32 = 1;
const SAVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Serialize, Deserialize)]
struct PortData {
    #[serde(default)]
    states: HashMap<String, StateValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    version: u32,
    #[serde(default)]
    data: HashMap<String, PortData>,
}

impl Default for StoredDocument {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            data: HashMap::new(),
        }
    }
}

struct SaverShared {
    path: PathBuf,
    data: Mutex<StoredDocument>,
}

/// Handle to the stored-states file. Cheap to clone via `Arc`.
pub struct StateStorage {
    shared: Arc<SaverShared>,
    serial_port: String,
    save_tx: mpsc::UnboundedSender<()>,
}

impl StateStorage {
    /// Load the file (or start an empty document) and spawn the saver task.
    /// The task exits once the storage handle is dropped.
    pub async fn open(path: PathBuf, serial_port: impl Into<String>) -> Result<Arc<Self>> {
        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredDocument::default(),
            Err(err) => return Err(err.into()),
        };

        let shared = Arc::new(SaverShared {
            path,
            data: Mutex::new(document),
        });

        let (save_tx, save_rx) = mpsc::unbounded_channel();
        tokio::spawn(saver_task(Arc::clone(&shared), save_rx));

        Ok(Arc::new(Self {
            shared,
            serial_port: serial_port.into(),
            save_tx,
        }))
    }

    /// Record a state and schedule a flush.
    pub fn store(&self, id: &str, value: StateValue) {
        {
            let mut document = match self.shared.data.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            document
                .data
                .entry(self.serial_port.clone())
                .or_default()
                .states
                .insert(id.to_string(), value);
        }

        // Fails only when the saver task is gone, i.e. during shutdown
        let _ = self.save_tx.send(());
    }

    /// States previously persisted for this serial port.
    pub fn stored_states(&self) -> HashMap<String, StateValue> {
        let document = match self.shared.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        document
            .data
            .get(&self.serial_port)
            .map(|port| port.states.clone())
            .unwrap_or_default()
    }
}

async fn saver_task(shared: Arc<SaverShared>, mut save_rx: mpsc::UnboundedReceiver<()>) {
    while save_rx.recv().await.is_some() {
        tokio::time::sleep(SAVE_DELAY).await;

        // Collapse every change that arrived during the delay into one write
        while save_rx.try_recv().is_ok() {}

        let serialized = {
            let document = match shared.data.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            serde_json::to_string_pretty(&*document)
        };

        match serialized {
            Ok(content) => {
                if let Err(err) = tokio::fs::write(&shared.path, content).await {
                    warn!(path = %shared.path.display(), error = %err, "failed to write stored states");
                } else {
                    debug!(path = %shared.path.display(), "stored states written");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize stored states"),
        }
    }
}
