//! In-memory channel used by the application-layer unit tests.
//!
//! Records every payload passed to `send`, lets a test push inbound units
//! with `emit`, and can be switched into a failing mode to exercise the
//! rollback paths of the domain objects.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vanlink_core::{Listener, Subscription};

use super::channel::{Channel, ChannelError};
use super::lock;

type SharedListener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct FakeChannel<T> {
    listener: Arc<Mutex<Option<SharedListener<T>>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    fail_sends: AtomicBool,
    listen_calls: AtomicUsize,
    /// Set when `send` ran while no listener was installed.
    sent_without_listener: AtomicBool,
}

impl<T: Send + 'static> FakeChannel<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listener: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            listen_calls: AtomicUsize::new(0),
            sent_without_listener: AtomicBool::new(false),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        let channel = Self::new();
        channel.set_failing(true);
        channel
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn emit(&self, value: &T) {
        let listener = lock(&self.listener).clone();
        if let Some(listener) = listener {
            listener(value);
        }
    }

    pub(crate) fn has_listener(&self) -> bool {
        lock(&self.listener).is_some()
    }

    pub(crate) fn listen_calls(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_without_listener(&self) -> bool {
        self.sent_without_listener.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).clone()
    }
}

impl FakeChannel<String> {
    pub(crate) fn emit_line(&self, line: &str) {
        self.emit(&line.to_string());
    }

    pub(crate) fn sent_lines(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|p| String::from_utf8_lossy(&p).into_owned())
            .collect()
    }
}

#[async_trait]
impl<T: Send + 'static> Channel for FakeChannel<T> {
    type Inbound = T;

    fn label(&self) -> &str {
        "fake"
    }

    fn listen(&self, listener: Listener<T>) -> Subscription {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.listener) = Some(Arc::from(listener));
        let slot = Arc::clone(&self.listener);
        Subscription::new(move || {
            *lock(&slot) = None;
        })
    }

    async fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.has_listener() {
            self.sent_without_listener.store(true, Ordering::SeqCst);
        }
        lock(&self.sent).push(payload.to_vec());
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChannelError::Transport("write rejected".into()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChannelError> {
        *lock(&self.listener) = None;
        Ok(())
    }
}

/// Lets spawned fire-and-forget requests run to completion.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
