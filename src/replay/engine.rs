use parking_lot::Mutex as ParkingMutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::capture::{Device, InputSource, Listener, ListenerControl};
use crate::error::{AutomatorError, AutomatorResult, InjectionError};
use crate::eventlog::{Event, NamedKey};
use crate::replay::{InputSink, Operation, OperationScript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of times the script is played, at least 1
    pub repeat_count: u32,
    pub stop_key: NamedKey,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            repeat_count: 1,
            stop_key: NamedKey::Escape,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub iterations_completed: u32,
    pub cancelled: bool,
    /// Operations the OS refused; replay carried on past each of them
    pub injection_failures: Vec<InjectionError>,
}

#[derive(Debug, Default)]
struct DrainState {
    queue: VecDeque<Operation>,
    cancelled: bool,
}

/// Cancels a running replay at the next operation boundary
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<ParkingMutex<DrainState>>,
}

impl CancelHandle {
    /// Empty the queue being drained and mark the run as cancelled
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        state.queue.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Clear a finished run's state so the next run starts fresh
    fn reset(&self) {
        let mut state = self.state.lock();
        state.cancelled = false;
        state.queue.clear();
    }

    /// Queue a fresh copy of the script; false if the run was cancelled meanwhile
    fn load(&self, operations: &[Operation]) -> bool {
        let mut state = self.state.lock();
        if state.cancelled {
            return false;
        }
        state.queue = operations.iter().copied().collect();
        true
    }

    fn next(&self) -> Option<Operation> {
        self.state.lock().queue.pop_front()
    }
}

/// Plays compiled scripts against an input sink
pub struct ReplayEngine<S: InputSink> {
    source: Arc<dyn InputSource>,
    sink: S,
    cancel: CancelHandle,
}

impl<S: InputSink> ReplayEngine<S> {
    /// `source` feeds the stop-key listener, `sink` receives the replayed input
    pub fn new(source: Arc<dyn InputSource>, sink: S) -> Self {
        Self {
            source,
            sink,
            cancel: CancelHandle::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Play `script` up to `repeat_count` times, or until the stop key is pressed
    ///
    /// Cancellation takes effect between operations: a sleep in progress always
    /// runs to completion first. A cancel issued before the run starts is kept
    /// and ends the run before anything is injected.
    pub fn run(&mut self, script: &OperationScript, options: &RunOptions) -> AutomatorResult<RunResult> {
        if options.repeat_count < 1 {
            return Err(AutomatorError::InvalidConfiguration(
                "repeat count must be at least 1".to_string(),
            ));
        }

        if script.is_empty() {
            self.cancel.reset();
            return Ok(RunResult {
                iterations_completed: options.repeat_count,
                cancelled: false,
                injection_failures: Vec::new(),
            });
        }

        let control = ListenerControl::new();
        let listener = Listener::spawn(
            self.source.as_ref(),
            Device::Keyboard,
            control.clone(),
            Self::stop_key_handler(control.clone(), self.cancel.clone(), options.stop_key),
        )?;

        tracing::info!(
            "Replaying {} operations x{} (stop key: {})",
            script.len(),
            options.repeat_count,
            options.stop_key
        );
        let started = Instant::now();

        let mut iterations_completed = 0;
        let mut injection_failures = Vec::new();

        while iterations_completed < options.repeat_count {
            if !self.cancel.load(script.operations()) {
                break;
            }

            while let Some(operation) = self.cancel.next() {
                if let Err(e) = self.execute(&operation) {
                    tracing::warn!("{}", e);
                    injection_failures.push(e);
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            iterations_completed += 1;
            tracing::debug!("Iteration {} done", iterations_completed);
        }

        control.stop();
        listener.join();

        let cancelled = self.cancel.is_cancelled();
        self.cancel.reset();
        tracing::info!(
            "Replay {} after {} iterations in {:?} ({} injection failures)",
            if cancelled { "cancelled" } else { "finished" },
            iterations_completed,
            started.elapsed(),
            injection_failures.len()
        );

        Ok(RunResult {
            iterations_completed,
            cancelled,
            injection_failures,
        })
    }

    fn execute(&mut self, operation: &Operation) -> Result<(), InjectionError> {
        match operation {
            Operation::Sleep(duration) => {
                if !duration.is_zero() {
                    std::thread::sleep(*duration);
                }
                Ok(())
            }
            other => {
                tracing::trace!("{}", other);
                self.sink.perform(other)
            }
        }
    }

    fn stop_key_handler(
        control: ListenerControl,
        cancel: CancelHandle,
        stop_key: NamedKey,
    ) -> crate::capture::EventHandler {
        Arc::new(move |event: Event| {
            if let Event::KeyDown(symbol) = event {
                if symbol.is_named(stop_key) {
                    control.stop();
                    cancel.cancel();
                    tracing::info!("Stop key pressed, cancelling replay");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::listener::testing::ChannelSource;
    use crate::eventlog::Symbol;
    use crate::replay::sink::testing::RecordingSink;
    use std::time::Duration;

    fn key_down(c: char) -> Operation {
        Operation::KeyDown(Symbol::Char(c))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met after 5s");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn repeats_the_script() {
        let sink = RecordingSink::default();
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(ChannelSource::new(), sink);
        let script = OperationScript::new(vec![
            Operation::Sleep(Duration::ZERO),
            key_down('a'),
            Operation::KeyUp(Symbol::Char('a')),
        ]);

        let result = engine
            .run(
                &script,
                &RunOptions {
                    repeat_count: 3,
                    ..RunOptions::default()
                },
            )
            .unwrap();

        assert_eq!(result.iterations_completed, 3);
        assert!(!result.cancelled);
        assert_eq!(performed.lock().len(), 6);
    }

    #[test]
    fn stop_key_cancels_after_current_sleep() {
        let source = ChannelSource::new();
        let sink = RecordingSink::default();
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(source.clone(), sink);
        let script = OperationScript::new(vec![
            Operation::Sleep(Duration::ZERO),
            key_down('a'),
            Operation::Sleep(Duration::from_millis(300)),
            key_down('b'),
        ]);

        let handle = std::thread::spawn(move || {
            let started = Instant::now();
            let result = engine.run(
                &script,
                &RunOptions {
                    repeat_count: 5,
                    ..RunOptions::default()
                },
            );
            (result, started.elapsed())
        });

        source.wait_for_subscribers(1);
        wait_until(|| !performed.lock().is_empty());
        source.emit(Event::KeyDown(Symbol::Named(NamedKey::Escape)));

        let (result, elapsed) = handle.join().unwrap();
        let result = result.unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations_completed, 0);
        assert_eq!(*performed.lock(), vec![key_down('a')]);
        // the in-flight sleep was not cut short
        assert!(elapsed >= Duration::from_millis(300));
    }

    #[test]
    fn other_keys_do_not_cancel() {
        let source = ChannelSource::new();
        let mut engine = ReplayEngine::new(source.clone(), RecordingSink::default());
        let script = OperationScript::new(vec![
            Operation::Sleep(Duration::from_millis(100)),
            key_down('b'),
        ]);

        let handle = std::thread::spawn(move || engine.run(&script, &RunOptions::default()));
        source.wait_for_subscribers(1);
        source.emit(Event::KeyDown(Symbol::Char('q')));
        source.emit(Event::KeyUp(Symbol::Named(NamedKey::Escape)));

        let result = handle.join().unwrap().unwrap();
        assert!(!result.cancelled);
        assert_eq!(result.iterations_completed, 1);
    }

    #[test]
    fn cancel_handle_stops_replay() {
        let sink = RecordingSink::default();
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(ChannelSource::new(), sink);
        let cancel = engine.cancel_handle();
        let script = OperationScript::new(vec![
            key_down('a'),
            Operation::Sleep(Duration::from_millis(200)),
            key_down('b'),
        ]);

        let handle = std::thread::spawn(move || engine.run(&script, &RunOptions::default()));
        wait_until(|| !performed.lock().is_empty());
        cancel.cancel();

        let result = handle.join().unwrap().unwrap();
        assert!(result.cancelled);
        assert_eq!(*performed.lock(), vec![key_down('a')]);
    }

    #[test]
    fn cancel_before_run_is_honoured() {
        let sink = RecordingSink::default();
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(ChannelSource::new(), sink);
        let script = OperationScript::new(vec![key_down('a')]);

        engine.cancel_handle().cancel();
        let result = engine.run(&script, &RunOptions::default()).unwrap();

        assert!(result.cancelled);
        assert_eq!(result.iterations_completed, 0);
        assert!(performed.lock().is_empty());

        // the cancel was consumed by that run
        let result = engine.run(&script, &RunOptions::default()).unwrap();
        assert!(!result.cancelled);
        assert_eq!(result.iterations_completed, 1);
        assert_eq!(*performed.lock(), vec![key_down('a')]);
    }

    #[test]
    fn injection_failure_does_not_abort() {
        let sink = RecordingSink {
            rejects: vec![key_down('x')],
            ..RecordingSink::default()
        };
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(ChannelSource::new(), sink);
        let script = OperationScript::new(vec![key_down('x'), key_down('y')]);

        let result = engine.run(&script, &RunOptions::default()).unwrap();

        assert_eq!(result.iterations_completed, 1);
        assert_eq!(result.injection_failures.len(), 1);
        assert_eq!(result.injection_failures[0].operation, key_down('x'));
        assert_eq!(*performed.lock(), vec![key_down('y')]);
    }

    #[test]
    fn empty_script_completes_immediately() {
        let source = ChannelSource::new();
        let mut engine = ReplayEngine::new(source.clone(), RecordingSink::default());

        let result = engine
            .run(
                &OperationScript::default(),
                &RunOptions {
                    repeat_count: 1000,
                    ..RunOptions::default()
                },
            )
            .unwrap();

        assert_eq!(result.iterations_completed, 1000);
        assert!(!result.cancelled);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn zero_repeats_is_rejected() {
        let mut engine = ReplayEngine::new(ChannelSource::new(), RecordingSink::default());
        let script = OperationScript::new(vec![key_down('a')]);
        assert!(matches!(
            engine.run(
                &script,
                &RunOptions {
                    repeat_count: 0,
                    ..RunOptions::default()
                }
            ),
            Err(AutomatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn refused_hook_fails_before_injecting() {
        let sink = RecordingSink::default();
        let performed = sink.performed.clone();
        let mut engine = ReplayEngine::new(ChannelSource::refusing(), sink);
        let script = OperationScript::new(vec![key_down('a')]);

        assert!(matches!(
            engine.run(&script, &RunOptions::default()),
            Err(AutomatorError::ListenerStartFailed(_))
        ));
        assert!(performed.lock().is_empty());
    }
}
