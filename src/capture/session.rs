use parking_lot::Mutex as ParkingMutex;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::listener::{Device, EventHandler, InputSource, Listener, ListenerControl};
use crate::capture::timer::Timer;
use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::{codec, Event, LogStore, NamedKey, RawEntry};
use crate::processing::{self, PostProcessOptions};

#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Log name; any extension is ignored
    pub name: String,
    pub stop_key: NamedKey,
    pub compress_held_keys: bool,
    /// Keep the raw log next to the canonical one
    pub keep_raw: bool,
    /// Skip post-processing and keep only the raw log
    pub keep_raw_only: bool,
    /// Reuse `name` even if a log with that name exists
    pub overwrite: bool,
}

impl RecordOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stop_key: NamedKey::Escape,
            compress_held_keys: true,
            keep_raw: false,
            keep_raw_only: false,
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingOutput {
    /// Name the recording was stored under, after duplicate resolution
    pub name: String,
    pub raw_log: PathBuf,
    /// Whether `raw_log` still exists
    pub raw_retained: bool,
    pub canonical_log: Option<PathBuf>,
    pub events_recorded: usize,
}

/// Destination of raw log lines
pub type LogWriter = Box<dyn Write + Send>;

/// Opens the raw log for a recording
pub type WriterFactory = Arc<dyn Fn(&Path) -> std::io::Result<LogWriter> + Send + Sync>;

fn open_line_writer(path: &Path) -> std::io::Result<LogWriter> {
    Ok(Box::new(LineWriter::new(File::create(path)?)))
}

/// Writer state shared by both listener threads
struct SessionLog {
    writer: Option<LogWriter>,
    timer: Timer,
    events: usize,
    stopped: bool,
    error: Option<std::io::Error>,
}

impl SessionLog {
    fn append(&mut self, event: Event) -> std::io::Result<()> {
        let stamp = self.timer.tick();
        let line = codec::encode_raw(&RawEntry {
            event,
            since_start: stamp.since_start,
            since_previous: stamp.since_previous,
        });
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
        }
        self.events += 1;
        Ok(())
    }
}

/// Records keyboard and pointer activity into a raw log until the stop key
pub struct RecordingSession {
    store: LogStore,
    source: Arc<dyn InputSource>,
    open_writer: WriterFactory,
}

impl RecordingSession {
    pub fn new(store: LogStore, source: Arc<dyn InputSource>) -> Self {
        Self::with_writer(store, source, Arc::new(open_line_writer))
    }

    /// Like [`RecordingSession::new`], with a custom way of opening the raw log
    pub fn with_writer(
        store: LogStore,
        source: Arc<dyn InputSource>,
        open_writer: WriterFactory,
    ) -> Self {
        Self {
            store,
            source,
            open_writer,
        }
    }

    /// Record until the stop key is pressed, then post-process unless told not to
    ///
    /// Blocks the calling thread for the whole recording.
    pub fn start(&self, options: &RecordOptions) -> AutomatorResult<RecordingOutput> {
        let base = LogStore::strip_extension(options.name.trim());
        if base.is_empty() {
            return Err(AutomatorError::InvalidConfiguration(
                "recording name is empty".to_string(),
            ));
        }

        self.store.ensure_dir()?;
        let name = if options.overwrite {
            base.to_string()
        } else {
            self.store.resolve_unique_name(base)
        };
        let raw_log = self.store.raw_path(&name);

        let writer =
            (self.open_writer)(&raw_log).map_err(|e| AutomatorError::write_failed(&raw_log, e))?;

        let control = ListenerControl::new();
        let log = Arc::new(ParkingMutex::new(SessionLog {
            writer: Some(writer),
            timer: Timer::start(),
            events: 0,
            stopped: false,
            error: None,
        }));

        let handler = Self::event_handler(log.clone(), control.clone(), options.stop_key);

        let listeners = match self.spawn_listeners(&log, control.clone(), handler) {
            Ok(listeners) => listeners,
            Err(e) => {
                control.stop();
                drop(log.lock().writer.take());
                let _ = std::fs::remove_file(&raw_log);
                return Err(e);
            }
        };

        tracing::info!(
            "Recording to {} (stop key: {})",
            raw_log.display(),
            options.stop_key
        );

        for listener in &listeners {
            listener.join();
        }

        let (events, error) = {
            let mut log = log.lock();
            let flushed = match log.writer.take() {
                Some(mut writer) => writer.flush(),
                None => Ok(()),
            };
            let error = log.error.take().or(flushed.err());
            (log.events, error)
        };

        if let Some(source) = error {
            tracing::error!(
                "Recording aborted after {} events; partial log kept at {}",
                events,
                raw_log.display()
            );
            return Err(AutomatorError::write_failed(&raw_log, source));
        }

        tracing::info!("Recording stopped ({} events)", events);

        let mut output = RecordingOutput {
            name,
            raw_log: raw_log.clone(),
            raw_retained: true,
            canonical_log: None,
            events_recorded: events,
        };

        if !options.keep_raw_only {
            let canonical = processing::compress(
                &raw_log,
                PostProcessOptions {
                    compress_held_keys: options.compress_held_keys,
                    keep_raw: options.keep_raw,
                },
            )?;
            output.canonical_log = Some(canonical);
            output.raw_retained = options.keep_raw;
        }

        Ok(output)
    }

    /// Subscribe both devices, restart the clock, then start the listener threads
    ///
    /// Events delivered while the hooks are being installed wait in their channels
    /// and are stamped against the restarted clock.
    fn spawn_listeners(
        &self,
        log: &ParkingMutex<SessionLog>,
        control: ListenerControl,
        handler: EventHandler,
    ) -> AutomatorResult<Vec<Listener>> {
        let keyboard_events = self.source.subscribe(Device::Keyboard)?;
        let pointer_events = self.source.subscribe(Device::Pointer)?;
        log.lock().timer = Timer::start();

        let keyboard = Listener::with_receiver(
            keyboard_events,
            Device::Keyboard,
            control.clone(),
            handler.clone(),
        )?;
        let pointer = Listener::with_receiver(pointer_events, Device::Pointer, control, handler)?;
        Ok(vec![keyboard, pointer])
    }

    fn event_handler(
        log: Arc<ParkingMutex<SessionLog>>,
        control: ListenerControl,
        stop_key: NamedKey,
    ) -> EventHandler {
        Arc::new(move |event: Event| {
            let mut log = log.lock();
            if log.stopped {
                return;
            }

            if let Event::KeyDown(symbol) = event {
                if symbol.is_named(stop_key) {
                    log.stopped = true;
                    control.stop();
                    return;
                }
            }

            if let Err(e) = log.append(event) {
                tracing::error!("Failed to append event: {}", e);
                log.error = Some(e);
                log.stopped = true;
                control.stop();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::listener::testing::ChannelSource;
    use crate::eventlog::{PointerButton, Symbol, VerticalScroll};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn run_session(
        dir: &TempDir,
        options: RecordOptions,
        events: Vec<Event>,
    ) -> AutomatorResult<RecordingOutput> {
        let source = ChannelSource::new();
        let session = RecordingSession::new(
            LogStore::new(dir.path().join("logs"), "log"),
            source.clone(),
        );

        let handle = std::thread::spawn(move || session.start(&options));
        source.wait_for_subscribers(2);
        for event in events {
            source.emit(event);
            // keep arrival order across the two listener threads
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.join().unwrap()
    }

    fn stop() -> Event {
        Event::KeyDown(Symbol::Named(NamedKey::Escape))
    }

    #[test]
    fn records_both_devices_in_arrival_order() {
        let dir = TempDir::new().unwrap();
        let mut options = RecordOptions::new("demo");
        options.keep_raw_only = true;

        let output = run_session(
            &dir,
            options,
            vec![
                Event::KeyDown(Symbol::Char('a')),
                Event::ButtonDown {
                    button: PointerButton::Left,
                    x: 10,
                    y: 20,
                },
                Event::ScrollVertical {
                    direction: VerticalScroll::Down,
                    x: 10,
                    y: 20,
                },
                Event::KeyUp(Symbol::Char('a')),
                stop(),
                Event::KeyUp(Symbol::Named(NamedKey::Escape)),
            ],
        )
        .unwrap();

        assert_eq!(output.events_recorded, 4);
        assert!(output.raw_retained);
        assert_eq!(output.canonical_log, None);
        assert!(output.raw_log.ends_with("logs/demo_RAW.log"));

        let content = std::fs::read_to_string(&output.raw_log).unwrap();
        let entries: Vec<RawEntry> = content
            .lines()
            .map(|l| codec::decode_raw(l).unwrap())
            .collect();
        let kinds: Vec<Event> = entries.iter().map(|e| e.event).collect();
        assert_eq!(kinds[0], Event::KeyDown(Symbol::Char('a')));
        assert!(matches!(kinds[1], Event::ButtonDown { x: 10, y: 20, .. }));
        assert!(matches!(kinds[2], Event::ScrollVertical { .. }));
        assert_eq!(kinds[3], Event::KeyUp(Symbol::Char('a')));

        // first delay equals first timestamp, later delays add up
        assert_eq!(entries[0].since_previous, entries[0].since_start);
        let sum: f64 = entries.iter().map(|e| e.since_previous).sum();
        assert!((sum - entries[3].since_start).abs() < 1e-6);
        assert!(entries.windows(2).all(|w| w[0].since_start <= w[1].since_start));
    }

    #[test]
    fn post_processes_into_canonical_log() {
        let dir = TempDir::new().unwrap();
        let output = run_session(
            &dir,
            RecordOptions::new("demo.log"),
            vec![
                Event::KeyDown(Symbol::Char('a')),
                Event::KeyDown(Symbol::Char('a')),
                Event::KeyDown(Symbol::Char('a')),
                Event::KeyUp(Symbol::Char('a')),
                stop(),
            ],
        )
        .unwrap();

        assert_eq!(output.events_recorded, 4);
        assert!(!output.raw_retained);
        assert!(!output.raw_log.exists());
        let canonical = output.canonical_log.unwrap();
        assert!(canonical.ends_with("logs/demo.log"));
        let content = std::fs::read_to_string(canonical).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn resolves_duplicate_names_unless_overwriting() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("demo.log"), "").unwrap();

        let mut options = RecordOptions::new("demo");
        options.keep_raw = true;
        let output = run_session(&dir, options.clone(), vec![stop()]).unwrap();
        assert_eq!(output.name, "demo_(1)");
        assert!(logs.join("demo_(1)_RAW.log").exists());
        assert!(logs.join("demo_(1).log").exists());

        options.overwrite = true;
        let output = run_session(&dir, options, vec![stop()]).unwrap();
        assert_eq!(output.name, "demo");
    }

    #[test]
    fn immediate_stop_yields_empty_logs() {
        let dir = TempDir::new().unwrap();
        let output = run_session(&dir, RecordOptions::new("empty"), vec![stop()]).unwrap();
        assert_eq!(output.events_recorded, 0);
        let content = std::fs::read_to_string(output.canonical_log.unwrap()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn configured_stop_key_only() {
        let dir = TempDir::new().unwrap();
        let mut options = RecordOptions::new("f8");
        options.stop_key = NamedKey::F(8);
        options.keep_raw_only = true;

        let output = run_session(
            &dir,
            options,
            vec![stop(), Event::KeyDown(Symbol::Named(NamedKey::F(8)))],
        )
        .unwrap();

        // escape is an ordinary key here
        assert_eq!(output.events_recorded, 1);
    }

    #[test]
    fn refused_hook_is_fatal_and_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path(), "log");
        let session = RecordingSession::new(store.clone(), ChannelSource::refusing());

        let result = session.start(&RecordOptions::new("denied"));

        assert!(matches!(result, Err(AutomatorError::ListenerStartFailed(_))));
        assert!(!store.raw_path("denied").exists());
    }

    #[test]
    fn clock_starts_once_listeners_are_up() {
        let dir = TempDir::new().unwrap();
        let source = ChannelSource::slow(Duration::from_millis(200));
        let session = RecordingSession::new(
            LogStore::new(dir.path(), "log"),
            source.clone(),
        );
        let mut options = RecordOptions::new("slow");
        options.keep_raw_only = true;

        let handle = std::thread::spawn(move || session.start(&options));
        source.wait_for_subscribers(2);
        source.emit(Event::KeyDown(Symbol::Char('a')));
        std::thread::sleep(Duration::from_millis(5));
        source.emit(stop());
        let output = handle.join().unwrap().unwrap();

        let content = std::fs::read_to_string(&output.raw_log).unwrap();
        let first = codec::decode_raw(content.lines().next().unwrap()).unwrap();
        // 400ms of subscription time must not leak into the first delay
        assert!(first.since_start < 0.15, "first event at {}", first.since_start);
        assert_eq!(first.since_previous, first.since_start);
    }

    /// Writes through to a file, then fails once `limit` lines are in
    struct FailingWriter {
        inner: LineWriter<File>,
        lines: Arc<AtomicUsize>,
        limit: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.lines.load(Ordering::SeqCst) >= self.limit {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let written = self.inner.write(buf)?;
            let newlines = buf[..written].iter().filter(|b| **b == b'\n').count();
            self.lines.fetch_add(newlines, Ordering::SeqCst);
            Ok(written)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    #[test]
    fn write_failure_aborts_and_keeps_partial_log() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path(), "log");
        let source = ChannelSource::new();
        let lines = Arc::new(AtomicUsize::new(0));
        let counter = lines.clone();
        let session = RecordingSession::with_writer(
            store.clone(),
            source.clone(),
            Arc::new(move |path: &Path| -> io::Result<LogWriter> {
                Ok(Box::new(FailingWriter {
                    inner: LineWriter::new(File::create(path)?),
                    lines: counter.clone(),
                    limit: 2,
                }))
            }),
        );

        let handle = std::thread::spawn(move || session.start(&RecordOptions::new("broken")));
        source.wait_for_subscribers(2);
        for event in [
            Event::KeyDown(Symbol::Char('a')),
            Event::KeyUp(Symbol::Char('a')),
            Event::KeyDown(Symbol::Char('b')),
        ] {
            source.emit(event);
            std::thread::sleep(Duration::from_millis(5));
        }

        // no stop key: the failed write ends the session
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(AutomatorError::FileWriteFailed { .. })));

        // both listener threads are gone, so their channels are closed
        source.emit(Event::KeyDown(Symbol::Char('c')));
        source.emit(Event::ButtonDown {
            button: PointerButton::Left,
            x: 0,
            y: 0,
        });
        assert_eq!(source.subscriber_count(), 0);

        let partial = std::fs::read_to_string(store.raw_path("broken")).unwrap();
        let kept: Vec<Event> = partial
            .lines()
            .map(|l| codec::decode_raw(l).unwrap().event)
            .collect();
        assert_eq!(
            kept,
            vec![
                Event::KeyDown(Symbol::Char('a')),
                Event::KeyUp(Symbol::Char('a'))
            ]
        );
        assert!(!store.canonical_path("broken").exists());
    }

    #[test]
    fn empty_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let session =
            RecordingSession::new(LogStore::new(dir.path(), "log"), ChannelSource::new());
        assert!(matches!(
            session.start(&RecordOptions::new("  ")),
            Err(AutomatorError::InvalidConfiguration(_))
        ));
    }
}
