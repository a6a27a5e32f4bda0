//! Application layer for the client.
//!
//! # What lives here?
//!
//! - **`channel`** – The [`channel::Channel`] port every domain object talks
//!   through.  Concrete channels live in the infrastructure layer.
//!
//! - One module per peripheral function: **`tank_sensor`**, **`drain_valve`**,
//!   **`heater_zone`**, **`environment`**, **`admin`** and **`battery_monitor`**.
//!   Each object listens on its channel *before* issuing its first request,
//!   folds inbound messages into an observable snapshot, and exposes command
//!   methods that update the snapshot optimistically and roll back on failure.

pub mod admin;
pub mod battery_monitor;
pub mod channel;
pub mod drain_valve;
pub mod environment;
pub mod heater_zone;
pub mod tank_sensor;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use channel::Channel;

/// Fires `payload` on `channel` without waiting for it.  Failure is expected
/// while the peripheral is still connecting, so it is only logged.
pub(crate) fn send_in_background<C>(channel: Arc<C>, payload: Vec<u8>)
where
    C: Channel + ?Sized + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(channel = %channel.label(), "no async runtime; initial request skipped");
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = channel.send(&payload).await {
            debug!(channel = %channel.label(), error = %e, "initial request failed");
        }
    });
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use testing::FakeChannel;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            lock(&self.0).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_skipped_initial_request_is_a_warning() {
        // Arrange – no tokio runtime on this thread; the subscriber keeps
        // its default INFO level
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let channel = FakeChannel::<String>::new();

        // Act
        tracing::subscriber::with_default(subscriber, || {
            send_in_background(Arc::clone(&channel), b"CFG?\n".to_vec());
        });

        // Assert
        let output = String::from_utf8_lossy(&lock(&captured.0)).into_owned();
        assert!(output.contains("WARN"), "got: {output}");
        assert!(output.contains("initial request skipped"));
        assert!(channel.sent().is_empty());
    }
}
