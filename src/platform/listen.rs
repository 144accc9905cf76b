//! Global input hook on top of `rdev::listen`.
//!
//! rdev installs one process-wide hook whose thread never returns, so a single
//! hub thread is started lazily and fans events out to per-device subscribers.
//! Subscribers that dropped their receiver are pruned on the next send.

use parking_lot::Mutex as ParkingMutex;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::capture::{Device, InputSource};
use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::{Event, HorizontalScroll, VerticalScroll};
use crate::platform::keymap;

/// rdev reports a failed hook by returning from `listen`; a hook still running
/// after this long is considered installed
const HOOK_STARTUP_GRACE: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Hub {
    subscribers: ParkingMutex<Vec<(Device, Sender<Event>)>>,
    cursor: ParkingMutex<(f64, f64)>,
    hook: ParkingMutex<HookState>,
}

#[derive(Default, PartialEq)]
enum HookState {
    #[default]
    Idle,
    Running,
}

fn hub() -> &'static Arc<Hub> {
    static HUB: OnceLock<Arc<Hub>> = OnceLock::new();
    HUB.get_or_init(|| Arc::new(Hub::default()))
}

/// [`InputSource`] backed by the OS hook
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevSource;

impl RdevSource {
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for RdevSource {
    fn subscribe(&self, device: Device) -> AutomatorResult<Receiver<Event>> {
        let hub = hub();
        ensure_hook(hub)?;

        let (tx, rx) = channel();
        hub.subscribers.lock().push((device, tx));
        tracing::debug!("Subscribed {} listener to OS hook", device);
        Ok(rx)
    }
}

fn ensure_hook(hub: &Arc<Hub>) -> AutomatorResult<()> {
    let mut state = hub.hook.lock();
    if *state == HookState::Running {
        return Ok(());
    }

    let (err_tx, err_rx) = channel::<String>();
    let thread_hub = hub.clone();
    std::thread::Builder::new()
        .name("rdev-hook".to_string())
        .spawn(move || {
            let callback_hub = thread_hub.clone();
            if let Err(e) = rdev::listen(move |event| callback_hub.dispatch(event)) {
                // the subscriber may still hold the state lock while waiting on this
                let _ = err_tx.send(format!("{:?}", e));
                *thread_hub.hook.lock() = HookState::Idle;
                tracing::error!("OS input hook stopped: {:?}", e);
            }
        })
        .map_err(|e| AutomatorError::ListenerStartFailed(e.to_string()))?;

    match err_rx.recv_timeout(HOOK_STARTUP_GRACE) {
        Ok(reason) => Err(AutomatorError::ListenerStartFailed(format!(
            "OS refused the input hook: {}",
            reason
        ))),
        Err(RecvTimeoutError::Timeout) => {
            *state = HookState::Running;
            tracing::info!("OS input hook installed");
            Ok(())
        }
        Err(RecvTimeoutError::Disconnected) => Err(AutomatorError::ListenerStartFailed(
            "input hook thread exited".to_string(),
        )),
    }
}

impl Hub {
    fn dispatch(&self, event: rdev::Event) {
        for translated in self.translate(event.event_type) {
            let mut subscribers = self.subscribers.lock();
            subscribers
                .retain(|(device, tx)| !device.accepts(&translated) || tx.send(translated).is_ok());
        }
    }

    fn translate(&self, event_type: rdev::EventType) -> Vec<Event> {
        use rdev::EventType;

        let position = || {
            let (x, y) = *self.cursor.lock();
            (x.round() as i32, y.round() as i32)
        };

        match event_type {
            EventType::KeyPress(key) => vec![Event::KeyDown(keymap::symbol_for_key(key))],
            EventType::KeyRelease(key) => vec![Event::KeyUp(keymap::symbol_for_key(key))],
            EventType::MouseMove { x, y } => {
                *self.cursor.lock() = (x, y);
                Vec::new()
            }
            EventType::ButtonPress(button) => {
                let (x, y) = position();
                vec![Event::ButtonDown {
                    button: keymap::pointer_button(button),
                    x,
                    y,
                }]
            }
            EventType::ButtonRelease(button) => {
                let (x, y) = position();
                vec![Event::ButtonUp {
                    button: keymap::pointer_button(button),
                    x,
                    y,
                }]
            }
            EventType::Wheel { delta_x, delta_y } => {
                let (x, y) = position();
                wheel_events(delta_x, delta_y, x, y)
            }
        }
    }
}

/// One scroll event per non-zero wheel axis; rdev's positive `delta_y` is up
fn wheel_events(delta_x: i64, delta_y: i64, x: i32, y: i32) -> Vec<Event> {
    let mut events = Vec::with_capacity(2);
    if delta_y != 0 {
        let direction = if delta_y > 0 {
            VerticalScroll::Up
        } else {
            VerticalScroll::Down
        };
        events.push(Event::ScrollVertical { direction, x, y });
    }
    if delta_x != 0 {
        let direction = if delta_x > 0 {
            HorizontalScroll::Right
        } else {
            HorizontalScroll::Left
        };
        events.push(Event::ScrollHorizontal { direction, x, y });
    }
    events
}
