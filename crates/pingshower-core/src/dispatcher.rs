use crate::error::{Error, IoError, IoOperation, Result};
use crate::observer::{Observer, ObserverSet};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::instrument;

/// The name of the notification thread.
pub const NOTIFY_THREAD_NAME: &str = "pingshower-notify";

/// A unit of work executed on the notification thread.
type Task = Box<dyn FnOnce(&mut ObserverSet) + Send>;

/// Delivers notifications to observers on a dedicated thread.
///
/// Tasks are executed strictly in submission order.  Registering and
/// unregistering observers are themselves tasks, so a change to the observer
/// set takes effect between two notifications and never during one.
pub struct Dispatcher {
    sender: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Dispatcher {
    /// Spawn the notification thread.
    #[instrument(level = "trace")]
    pub fn start() -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Task>();
        let handle = thread::Builder::new()
            .name(String::from(NOTIFY_THREAD_NAME))
            .spawn(move || {
                let mut observers = ObserverSet::default();
                for task in receiver {
                    task(&mut observers);
                }
                tracing::debug!(observers = observers.len(), "notification thread finished");
            })
            .map_err(|err| Error::IoError(IoError::Other(err, IoOperation::SpawnThread)))?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn post_rtt(&self, timeout: bool, sequence: u64, rtt_ms: u64) {
        self.submit(Box::new(move |observers| {
            observers.notify("rtt", |o| o.on_rtt_update(timeout, sequence, rtt_ms));
        }));
    }

    pub fn post_loss(&self, sequence: u64, loss: f64) {
        self.submit(Box::new(move |observers| {
            observers.notify("loss", |o| o.on_packet_loss_update(sequence, loss));
        }));
    }

    pub fn post_stop(&self) {
        self.submit(Box::new(|observers| {
            observers.notify("stop", |o| o.on_stop());
        }));
    }

    pub fn add(&self, observer: Arc<dyn Observer>) {
        self.submit(Box::new(move |observers| observers.add(observer)));
    }

    pub fn remove(&self, observer: &Arc<dyn Observer>) {
        let observer = Arc::clone(observer);
        self.submit(Box::new(move |observers| observers.remove(&observer)));
    }

    /// Is the observer registered once all previously submitted tasks have run?
    ///
    /// Blocks until the notification thread answers.  Returns false if the
    /// dispatcher has been shut down or if called from the notification thread.
    pub fn contains(&self, observer: &Arc<dyn Observer>) -> bool {
        if thread::current().id() == self.thread_id {
            tracing::warn!("observer membership queried from the notification thread");
            return false;
        }
        let observer = Arc::clone(observer);
        let (reply_tx, reply_rx) = channel::bounded(1);
        let submitted = self.submit(Box::new(move |observers| {
            let _ = reply_tx.send(observers.contains(&observer));
        }));
        submitted && reply_rx.recv().unwrap_or(false)
    }

    /// Close the task queue and wait for all queued tasks to run.
    ///
    /// Safe to call more than once and from any thread.  Every caller waits
    /// for the queue to drain, except the notification thread itself which
    /// returns immediately.
    #[instrument(skip(self), level = "trace")]
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        if thread::current().id() == self.thread_id {
            return;
        }
        let mut handle = self.handle.lock();
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                tracing::error!("notification thread panicked");
            }
        }
    }

    fn submit(&self, task: Task) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => {
                tracing::trace!("dropping notification submitted after shutdown");
                false
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
