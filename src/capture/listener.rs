//! OS input listeners
//!
//! An [`InputSource`] hands out per-device event channels. A [`Listener`]
//! drains one channel on its own notification thread and calls a handler for
//! every event, until its [`ListenerControl`] is stopped.

use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AutomatorResult;
use crate::eventlog::Event;

/// How often a listener thread re-checks its control while idle
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Keyboard,
    Pointer,
}

impl Device {
    pub fn accepts(&self, event: &Event) -> bool {
        match self {
            Device::Keyboard => event.is_keyboard(),
            Device::Pointer => !event.is_keyboard(),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Keyboard => write!(f, "keyboard"),
            Device::Pointer => write!(f, "pointer"),
        }
    }
}

/// Source of captured input events
pub trait InputSource: Send + Sync {
    /// Start delivering events of `device`. Dropping the receiver unsubscribes.
    fn subscribe(&self, device: Device) -> AutomatorResult<Receiver<Event>>;
}

/// Shared run flag; stopping it ends every listener spawned with a clone of it
#[derive(Debug, Clone)]
pub struct ListenerControl {
    running: Arc<AtomicBool>,
}

impl ListenerControl {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for ListenerControl {
    fn default() -> Self {
        Self::new()
    }
}

pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

pub struct Listener {
    device: Device,
    control: ListenerControl,
    thread_handle: ParkingMutex<Option<std::thread::JoinHandle<()>>>,
}

impl Listener {
    /// Subscribe to `device` on `source` and start the notification thread
    pub fn spawn(
        source: &dyn InputSource,
        device: Device,
        control: ListenerControl,
        handler: EventHandler,
    ) -> AutomatorResult<Self> {
        let events = source.subscribe(device)?;
        Self::with_receiver(events, device, control, handler)
    }

    /// Start the notification thread on an existing subscription
    ///
    /// Events already queued on `events` are delivered first.
    pub fn with_receiver(
        events: Receiver<Event>,
        device: Device,
        control: ListenerControl,
        handler: EventHandler,
    ) -> AutomatorResult<Self> {
        let thread_control = control.clone();

        let handle = std::thread::Builder::new()
            .name(format!("{}-listener", device))
            .spawn(move || {
                tracing::debug!("{} listener started", device);
                while thread_control.is_running() {
                    match events.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => {
                            if thread_control.is_running() {
                                handler(event);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("{} listener stopped", device);
            })
            .map_err(|e| {
                crate::error::AutomatorError::ListenerStartFailed(format!(
                    "cannot spawn {} listener thread: {}",
                    device, e
                ))
            })?;

        Ok(Self {
            device,
            control,
            thread_handle: ParkingMutex::new(Some(handle)),
        })
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Block until the notification thread exits
    pub fn join(&self) {
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("{} listener thread panicked", self.device);
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}
