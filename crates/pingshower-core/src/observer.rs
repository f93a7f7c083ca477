use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A receiver of probe measurements.
///
/// All callbacks are invoked on the notification thread, one at a time and in
/// the order the measurements were taken.  A callback may take as long as it
/// likes without delaying the network I/O of the client.
///
/// Callbacks must not call [`crate::PingClient::has_observer`], which waits on
/// the notification thread.
pub trait Observer: Send + Sync {
    /// A probe completed.
    ///
    /// `rtt_ms` is the round trip time in milliseconds or, if `timeout` is
    /// true, the probe timeout.
    fn on_rtt_update(&self, timeout: bool, sequence: u64, rtt_ms: u64);

    /// A loss window closed.
    ///
    /// `sequence` is the first sequence number of the window and `loss` is the
    /// fraction of probes in the window that timed out.
    fn on_packet_loss_update(&self, sequence: u64, loss: f64);

    /// The client stopped, no further callbacks will follow.
    fn on_stop(&self) {}
}

/// The observers registered with a client, owned by the notification thread.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverSet {
    /// Register an observer, ignored if it is already registered.
    pub fn add(&mut self, observer: Arc<dyn Observer>) {
        if !self.contains(&observer) {
            self.observers.push(observer);
        }
    }

    /// Unregister an observer, ignored if it is not registered.
    pub fn remove(&mut self, observer: &Arc<dyn Observer>) {
        self.observers.retain(|o| !same_observer(o, observer));
    }

    pub fn contains(&self, observer: &Arc<dyn Observer>) -> bool {
        self.observers.iter().any(|o| same_observer(o, observer))
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Invoke `f` for every observer in registration order.
    ///
    /// A panic raised by an observer is logged and does not prevent delivery to
    /// the remaining observers.
    pub fn notify<F: Fn(&dyn Observer)>(&self, event: &str, f: F) {
        for observer in &self.observers {
            if panic::catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                tracing::error!(event, "observer panicked");
            }
        }
    }
}

/// Observers are compared by identity, not by value.
fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
