//! Concrete channels over a [`PeripheralLink`].
//!
//! A [`NotifyChannel`] monitors one characteristic, feeds every notification
//! chunk into a [`Reassembler`], and hands each complete unit to the
//! listener.  The reassembler decides what a unit is:
//!
//! - [`line::LineBuffer`] – newline-delimited text (water and heater modules).
//! - [`frame::FrameAssembler`] – magic-delimited binary frames (battery BMS).
//!
//! Units from one chunk are delivered in order, synchronously, before the
//! next chunk is looked at.  A panicking listener is caught and logged so
//! that reassembly keeps going.

pub mod frame;
pub mod line;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tracing::{debug, warn};
use vanlink_core::{ChannelAddress, Listener, Subscription};

use super::link::{PeripheralLink, TransportError};
use crate::application::channel::{Channel, ChannelError};
use crate::application::lock;

pub use frame::FrameAssembler;
pub use line::LineBuffer;

/// Text channel used by the water and heater modules.
pub type LineChannel = NotifyChannel<LineBuffer>;

/// Decoded-frame channel used by the battery.
pub type FrameChannel = NotifyChannel<FrameAssembler>;

/// Turns a stream of notification chunks into protocol units.
pub trait Reassembler: Send + 'static {
    type Output: Send + 'static;

    /// Appends `chunk` and returns every unit it completed, oldest first.
    /// Malformed input is logged (tagged with `label`) and dropped.
    fn push(&mut self, chunk: &[u8], label: &str) -> Vec<Self::Output>;

    /// Discards buffered bytes.
    fn reset(&mut self);
}

type SharedListener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<R: Reassembler> {
    label: String,
    reassembler: Mutex<R>,
    /// Active listener tagged with the generation of the `listen` call that
    /// installed it.
    listener: Mutex<Option<(u64, SharedListener<R::Output>)>>,
    monitor: Mutex<Option<Subscription>>,
    generation: AtomicU64,
    closed: AtomicBool,
}

impl<R: Reassembler> Shared<R> {
    fn on_notification(&self, notification: Result<&[u8], TransportError>) {
        let chunk = match notification {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(channel = %self.label, error = %e, "notification error");
                return;
            }
        };
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let Some(listener) = lock(&self.listener).as_ref().map(|(_, l)| Arc::clone(l)) else {
            return;
        };

        let units = lock(&self.reassembler).push(chunk, &self.label);
        for unit in &units {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(unit)));
            if outcome.is_err() {
                warn!(channel = %self.label, "channel listener panicked; unit dropped");
            }
        }
    }

    /// Removes the listener and the monitor if `generation` still owns them.
    fn release(&self, generation: Option<u64>) {
        {
            let mut listener = lock(&self.listener);
            if let (Some((current, _)), Some(wanted)) = (listener.as_ref(), generation) {
                if *current != wanted {
                    return;
                }
            }
            *listener = None;
        }
        let monitor = lock(&self.monitor).take();
        if let Some(monitor) = monitor {
            monitor.unsubscribe();
        }
        lock(&self.reassembler).reset();
    }
}

/// A logical channel: one notify characteristic plus one write
/// characteristic on a shared link.
pub struct NotifyChannel<R: Reassembler> {
    link: Arc<dyn PeripheralLink>,
    address: ChannelAddress,
    shared: Arc<Shared<R>>,
}

impl<R: Reassembler + Default> NotifyChannel<R> {
    pub fn new(link: Arc<dyn PeripheralLink>, address: ChannelAddress, label: impl Into<String>) -> Self {
        Self {
            link,
            address,
            shared: Arc::new(Shared {
                label: label.into(),
                reassembler: Mutex::new(R::default()),
                listener: Mutex::new(None),
                monitor: Mutex::new(None),
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl<R: Reassembler> NotifyChannel<R> {
    pub fn address(&self) -> ChannelAddress {
        self.address
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Feeds one raw notification as if the link had delivered it.
    pub fn handle_notification(&self, chunk: &[u8]) {
        self.shared.on_notification(Ok(chunk));
    }
}

#[async_trait]
impl<R: Reassembler> Channel for NotifyChannel<R> {
    type Inbound = R::Output;

    fn label(&self) -> &str {
        &self.shared.label
    }

    fn listen(&self, listener: Listener<R::Output>) -> Subscription {
        if self.is_closed() {
            debug!(channel = %self.shared.label, "listen on a closed channel ignored");
            return Subscription::empty();
        }

        // Drop the previous registration before monitoring again.
        self.shared.release(None);
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.shared.listener) = Some((generation, Arc::from(listener)));

        let weak: Weak<Shared<R>> = Arc::downgrade(&self.shared);
        let monitored = self.link.monitor(
            self.address.service,
            self.address.notify,
            Box::new(move |notification| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_notification(notification);
                }
            }),
        );
        match monitored {
            Ok(monitor) => *lock(&self.shared.monitor) = Some(monitor),
            Err(e) => warn!(channel = %self.shared.label, error = %e, "cannot monitor characteristic"),
        }

        let weak = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.release(Some(generation));
            }
        })
    }

    async fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.link
            .write(self.address.service, self.address.write, payload, self.address.write_mode)
            .await
            .map_err(ChannelError::from)
    }

    async fn disconnect(&self) -> Result<(), ChannelError> {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            debug!(channel = %self.shared.label, "channel disconnected");
        }
        self.shared.release(None);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
