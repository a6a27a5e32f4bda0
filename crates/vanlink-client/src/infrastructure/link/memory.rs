//! In-process [`PeripheralLink`].
//!
//! `MemoryLink` stands in for a real radio: it records every write, lets the
//! caller push notification chunks into monitored characteristics, and can be
//! told to reject writes.  The replay tool and the tests both drive the
//! client through it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;
use vanlink_core::{Subscription, WriteMode};

use super::{NotificationHandler, PeripheralLink, TransportError};
use crate::application::lock;

/// One write accepted by a [`MemoryLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub service: Uuid,
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
    pub mode: WriteMode,
}

type SharedHandler = Arc<dyn Fn(Result<&[u8], TransportError>) + Send + Sync>;

struct Monitor {
    id: u64,
    service: Uuid,
    characteristic: Uuid,
    handler: SharedHandler,
}

struct LinkState {
    connected: bool,
    fail_writes: bool,
    monitors: Vec<Monitor>,
    writes: Vec<RecordedWrite>,
    cancel_count: usize,
    next_id: u64,
}

pub struct MemoryLink {
    device_id: String,
    state: Arc<Mutex<LinkState>>,
}

impl MemoryLink {
    /// A connected link to the peripheral `device_id`.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            state: Arc::new(Mutex::new(LinkState {
                connected: true,
                fail_writes: false,
                monitors: Vec::new(),
                writes: Vec::new(),
                cancel_count: 0,
                next_id: 0,
            })),
        }
    }

    /// Delivers `chunk` to every monitor of `characteristic`.  Returns how
    /// many monitors received it; chunks nobody monitors are dropped.
    pub fn notify(&self, service: Uuid, characteristic: Uuid, chunk: &[u8]) -> usize {
        let handlers = self.handlers(service, characteristic);
        for handler in &handlers {
            handler(Ok(chunk));
        }
        handlers.len()
    }

    /// Reports `error` to every monitor of `characteristic`.
    pub fn notify_error(&self, service: Uuid, characteristic: Uuid, error: TransportError) -> usize {
        let handlers = self.handlers(service, characteristic);
        for handler in &handlers {
            handler(Err(error.clone()));
        }
        handlers.len()
    }

    /// Makes every later write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        lock(&self.state).writes.clone()
    }

    /// Payloads written to `characteristic`, decoded as text.
    pub fn written_lines(&self, characteristic: Uuid) -> Vec<String> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|w| w.characteristic == characteristic)
            .map(|w| String::from_utf8_lossy(&w.payload).into_owned())
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    pub fn cancel_count(&self) -> usize {
        lock(&self.state).cancel_count
    }

    pub fn monitor_count(&self) -> usize {
        lock(&self.state).monitors.len()
    }

    // Handlers are copied out so they run without the lock held.
    fn handlers(&self, service: Uuid, characteristic: Uuid) -> Vec<SharedHandler> {
        lock(&self.state)
            .monitors
            .iter()
            .filter(|m| m.service == service && m.characteristic == characteristic)
            .map(|m| Arc::clone(&m.handler))
            .collect()
    }
}

#[async_trait]
impl PeripheralLink for MemoryLink {
    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn monitor(
        &self,
        service: Uuid,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<Subscription, TransportError> {
        let id = {
            let mut state = lock(&self.state);
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            let id = state.next_id;
            state.next_id += 1;
            state.monitors.push(Monitor {
                id,
                service,
                characteristic,
                handler: Arc::from(handler),
            });
            id
        };

        let weak = Arc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).monitors.retain(|m| m.id != id);
            }
        }))
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_writes {
            return Err(TransportError::Write("write rejected by peripheral".to_string()));
        }
        state.writes.push(RecordedWrite {
            service,
            characteristic,
            payload: payload.to_vec(),
            mode,
        });
        Ok(())
    }

    async fn cancel_connection(&self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.connected = false;
        state.cancel_count += 1;
        state.monitors.clear();
        Ok(())
    }
}
