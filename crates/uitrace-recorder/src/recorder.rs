//! In-memory interaction recorder
//!
//! One ordered buffer, a recording flag, the current screen and a config.
//! Every mutation runs inside one critical section covering
//! filter + append + notify, so observers always see their own write.

use crate::config::RecorderConfig;
use crate::error::{Error, Result};
use crate::events::{EventType, InteractionEvent, Meta};
use crate::storage::{export_file_name, ExportTarget};
pub use crossbeam_channel::Receiver;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

pub const RECORDING_STARTED: &str = "Recording started";
pub const RECORDING_STOPPED: &str = "Recording stopped";
pub const DEFAULT_SCREEN: &str = "/";

/// What just changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Started,
    Stopped,
    EventLogged,
    Cleared,
    Loaded,
    ConfigUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Change) + Send + Sync>;

#[derive(Clone)]
enum Observer {
    Callback(Callback),
    Channel(Sender<Change>),
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

struct RecorderState {
    events: Vec<InteractionEvent>,
    is_recording: bool,
    current_screen: String,
    config: RecorderConfig,
    over_capacity: bool,
}

impl RecorderState {
    // max_events is advisory: warn once per fill, never evict
    fn check_capacity(&mut self) {
        let max = self.config.max_events;
        if !self.over_capacity && self.events.len() > max {
            self.over_capacity = true;
            warn!(len = self.events.len(), max_events = max, "event buffer exceeds maxEvents");
        }
    }

    fn synthetic(&self, value: &str) -> InteractionEvent {
        InteractionEvent::new(EventType::Custom, self.current_screen.clone()).with_value(value)
    }
}

/// The recorder. Share it as `Arc<EventRecorder>` from the host's composition root.
pub struct EventRecorder {
    op: ReentrantMutex<()>,
    state: RwLock<RecorderState>,
    observers: Mutex<Observers>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default())
    }

    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            op: ReentrantMutex::new(()),
            state: RwLock::new(RecorderState {
                events: Vec::new(),
                is_recording: false,
                current_screen: DEFAULT_SCREEN.to_string(),
                config,
                over_capacity: false,
            }),
            observers: Mutex::new(Observers::default()),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Clears the buffer and records a synthetic start event
    pub fn start(&self) {
        let _op = self.op.lock();
        {
            let mut s = self.state.write();
            if s.is_recording {
                return;
            }
            s.is_recording = true;
            s.events.clear();
            s.over_capacity = false;
            let started = s.synthetic(RECORDING_STARTED);
            s.events.push(started);
        }
        info!("recording started");
        self.notify(Change::Started);
    }

    /// Records a synthetic stop event, then stops
    pub fn stop(&self) {
        let _op = self.op.lock();
        let count = {
            let mut s = self.state.write();
            if !s.is_recording {
                return;
            }
            let stopped = s.synthetic(RECORDING_STOPPED);
            s.events.push(stopped);
            s.check_capacity();
            s.is_recording = false;
            s.events.len()
        };
        info!(events = count, "recording stopped");
        self.notify(Change::Stopped);
    }

    pub fn is_recording(&self) -> bool {
        self.state.read().is_recording
    }

    // ------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------

    /// Appends the event if recording and its type is enabled.
    /// Returns whether it was appended.
    pub fn log_event(&self, event: InteractionEvent) -> bool {
        let _op = self.op.lock();
        {
            let mut s = self.state.write();
            if !s.is_recording {
                return false;
            }
            if !s.config.is_enabled(&event.event_type) {
                trace!(event_type = %event.event_type, "event type disabled");
                return false;
            }
            debug!(event_type = %event.event_type, screen = %event.screen, "event logged");
            s.events.push(event);
            s.check_capacity();
        }
        self.notify(Change::EventLogged);
        true
    }

    /// Stamps a new event with the current screen and logs it, holding the
    /// operation lock so a concurrent navigation cannot land in between.
    fn log_here(
        &self,
        event_type: EventType,
        build: impl FnOnce(InteractionEvent) -> InteractionEvent,
    ) -> bool {
        let _op = self.op.lock();
        let event = InteractionEvent::new(event_type, self.current_screen());
        self.log_event(build(event))
    }

    pub fn log_tap(&self, widget_key: &str, meta: Option<Meta>) -> bool {
        self.log_here(EventType::Tap, |e| e.with_widget_key(widget_key).with_meta(meta))
    }

    pub fn log_long_press(&self, widget_key: &str, meta: Option<Meta>) -> bool {
        self.log_here(EventType::LongPress, |e| e.with_widget_key(widget_key).with_meta(meta))
    }

    /// `value` is logged verbatim; mask it first if it is sensitive
    pub fn log_text_input(&self, widget_key: &str, value: &str, meta: Option<Meta>) -> bool {
        self.log_here(EventType::TextInput, |e| {
            e.with_widget_key(widget_key).with_value(value).with_meta(meta)
        })
    }

    pub fn log_scroll(
        &self,
        widget_key: &str,
        direction: &str,
        distance: f64,
        meta: Option<Meta>,
    ) -> bool {
        let mut meta = meta.unwrap_or_default();
        meta.insert("distance".to_string(), serde_json::json!(distance));
        self.log_here(EventType::Scroll, |e| {
            e.with_widget_key(widget_key).with_value(direction).with_meta(Some(meta))
        })
    }

    /// Moves the current screen to `to` whether or not the event is recorded
    pub fn log_navigation(&self, from: &str, to: &str, meta: Option<Meta>) -> bool {
        let _op = self.op.lock();
        let event = InteractionEvent::new(EventType::Navigation, from)
            .with_value(to)
            .with_meta(meta);
        self.update_current_screen(to);
        self.log_event(event)
    }

    pub fn log_dialog(&self, widget_key: &str, value: Option<&str>, meta: Option<Meta>) -> bool {
        self.log_here(EventType::Dialog, |e| {
            with_optional_value(e.with_widget_key(widget_key), value, meta)
        })
    }

    pub fn log_bottom_sheet(
        &self,
        widget_key: &str,
        value: Option<&str>,
        meta: Option<Meta>,
    ) -> bool {
        self.log_here(EventType::BottomSheet, |e| {
            with_optional_value(e.with_widget_key(widget_key), value, meta)
        })
    }

    pub fn log_custom(&self, name: &str, value: Option<&str>, meta: Option<Meta>) -> bool {
        self.log_here(EventType::Custom, |e| {
            with_optional_value(e.with_widget_key(name), value, meta)
        })
    }

    /// No event, no notification
    pub fn update_current_screen(&self, screen: &str) {
        let _op = self.op.lock();
        self.state.write().current_screen = screen.to_string();
    }

    pub fn current_screen(&self) -> String {
        self.state.read().current_screen.clone()
    }

    /// Empties the buffer; recording continues if it was on
    pub fn clear(&self) {
        let _op = self.op.lock();
        {
            let mut s = self.state.write();
            s.events.clear();
            s.over_capacity = false;
        }
        self.notify(Change::Cleared);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Snapshot of the buffer
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.state.read().events.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().events.is_empty()
    }

    pub fn events_by_type(&self, event_type: &EventType) -> Vec<InteractionEvent> {
        self.state
            .read()
            .events
            .iter()
            .filter(|e| &e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn events_by_screen(&self, screen: &str) -> Vec<InteractionEvent> {
        self.state
            .read()
            .events
            .iter()
            .filter(|e| e.screen == screen)
            .cloned()
            .collect()
    }

    /// Count per type present in the buffer; absent types have no entry
    pub fn event_statistics(&self) -> BTreeMap<EventType, usize> {
        statistics(&self.state.read().events)
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// The whole buffer as a JSON array, regardless of the current config
    pub fn export_to_json(&self) -> String {
        let s = self.state.read();
        match serde_json::to_string_pretty(&s.events) {
            Ok(json) => json,
            Err(e) => {
                // only reachable with non-string map keys, which Meta cannot hold
                warn!(error = %e, "failed to serialize events");
                String::from("[]")
            }
        }
    }

    /// Writes the export through `target`. `None` on any I/O failure.
    pub fn export_to_file(&self, target: &dyn ExportTarget, name: &str) -> Option<PathBuf> {
        match self.write_export(target, name) {
            Ok(path) => {
                info!(path = %path.display(), "events exported");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                None
            }
        }
    }

    fn write_export(&self, target: &dyn ExportTarget, name: &str) -> Result<PathBuf> {
        let json = self.export_to_json();
        let dir = target.resolve_writable_directory()?;
        let path = dir.join(export_file_name(name));
        target.write_file(&path, &json)?;
        Ok(path)
    }

    /// Replaces the buffer with the parsed events, all or nothing.
    /// On failure the buffer is untouched and nobody is notified.
    pub fn load_from_json(&self, text: &str) -> Result<usize> {
        let events: Vec<InteractionEvent> = match serde_json::from_str(text) {
            Ok(events) => events,
            Err(e) => {
                let err = Error::from(e);
                warn!(error = %err, "ignoring invalid event log");
                return Err(err);
            }
        };
        let _op = self.op.lock();
        let count = events.len();
        {
            let mut s = self.state.write();
            s.events = events;
            s.over_capacity = false;
            s.check_capacity();
        }
        info!(events = count, "events loaded");
        self.notify(Change::Loaded);
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn config(&self) -> RecorderConfig {
        self.state.read().config.clone()
    }

    /// Affects future logging only; the buffer is not re-filtered
    pub fn update_config(&self, config: RecorderConfig) {
        let _op = self.op.lock();
        self.state.write().config = config;
        self.notify(Change::ConfigUpdated);
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.add_observer(Observer::Callback(Arc::new(f)))
    }

    /// Returns true if the subscription existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut obs = self.observers.lock();
        let before = obs.entries.len();
        obs.entries.retain(|(i, _)| *i != id);
        obs.entries.len() != before
    }

    /// Channel of changes; dropping the receiver unsubscribes
    pub fn watch(&self) -> Receiver<Change> {
        let (tx, rx) = unbounded();
        self.add_observer(Observer::Channel(tx));
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().entries.len()
    }

    fn add_observer(&self, observer: Observer) -> SubscriptionId {
        let mut obs = self.observers.lock();
        let id = SubscriptionId(obs.next_id);
        obs.next_id += 1;
        obs.entries.push((id, observer));
        id
    }

    // Called with `op` held and `state` released
    fn notify(&self, change: Change) {
        let entries = self.observers.lock().entries.clone();
        let mut dead = Vec::new();
        for (id, observer) in entries {
            match observer {
                Observer::Callback(f) => f(&change),
                Observer::Channel(tx) => {
                    if tx.send(change).is_err() {
                        dead.push(id);
                    }
                }
            }
        }
        if !dead.is_empty() {
            self.observers.lock().entries.retain(|(id, _)| !dead.contains(id));
        }
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn with_optional_value(
    event: InteractionEvent,
    value: Option<&str>,
    meta: Option<Meta>,
) -> InteractionEvent {
    let mut event = event.with_meta(meta);
    event.value = value.map(str::to_string);
    event
}

/// Count per event type, zero counts omitted
pub fn statistics(events: &[InteractionEvent]) -> BTreeMap<EventType, usize> {
    let mut stats = BTreeMap::new();
    for e in events {
        *stats.entry(e.event_type.clone()).or_insert(0) += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording() -> EventRecorder {
        let r = EventRecorder::new();
        r.start();
        r
    }

    #[test]
    fn start_resets_to_single_custom_event() {
        let r = recording();
        r.log_tap("a", None);
        r.log_tap("b", None);
        r.stop();
        r.start();
        let events = r.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Custom);
        assert_eq!(events[0].value.as_deref(), Some(RECORDING_STARTED));
    }

    #[test]
    fn start_bypasses_the_type_filter() {
        let r = EventRecorder::with_config(
            RecorderConfig::default().with_enabled_types([EventType::Tap]),
        );
        r.start();
        r.stop();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let r = recording();
        r.start();
        assert_eq!(r.len(), 1);
        r.stop();
        r.stop();
        assert_eq!(r.len(), 2);
        assert!(!r.is_recording());
    }

    #[test]
    fn stopped_recorder_drops_everything() {
        let r = EventRecorder::new();
        assert!(!r.log_tap("btn", None));
        r.log_long_press("btn", None);
        r.log_text_input("f", "x", None);
        r.log_scroll("list", "down", 10.0, None);
        r.log_custom("c", None, None);
        assert!(r.is_empty());
    }

    #[test]
    fn disabled_type_is_dropped() {
        let r = EventRecorder::with_config(RecorderConfig::default().without_type(&EventType::Tap));
        r.start();
        assert!(!r.log_tap("btn", None));
        assert!(r.log_long_press("btn", None));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn events_carry_current_screen() {
        let r = recording();
        r.update_current_screen("/settings");
        r.log_tap("save", None);
        let last = r.events().pop().unwrap();
        assert_eq!(last.screen, "/settings");
        assert_eq!(last.widget_key.as_deref(), Some("save"));
        assert_eq!(last.value, None);
    }

    #[test]
    fn scroll_merges_distance_into_meta() {
        let r = recording();
        let mut meta = Meta::new();
        meta.insert("list".into(), "inbox".into());
        r.log_scroll("feed", "up", 42.5, Some(meta));
        let e = r.events_by_type(&EventType::Scroll).remove(0);
        assert_eq!(e.value.as_deref(), Some("up"));
        let meta = e.meta.unwrap();
        assert_eq!(meta["distance"], 42.5);
        assert_eq!(meta["list"], "inbox");
    }

    #[test]
    fn navigation_updates_screen_even_when_disabled() {
        let r = EventRecorder::with_config(
            RecorderConfig::default().without_type(&EventType::Navigation),
        );
        r.start();
        assert!(!r.log_navigation("/a", "/b", None));
        assert_eq!(r.current_screen(), "/b");
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn navigation_event_uses_from_and_to() {
        let r = recording();
        r.log_navigation("/home", "/cart", None);
        let e = r.events_by_type(&EventType::Navigation).remove(0);
        assert_eq!(e.screen, "/home");
        assert_eq!(e.value.as_deref(), Some("/cart"));
        assert_eq!(r.current_screen(), "/cart");
    }

    #[test]
    fn navigation_while_stopped_still_moves_screen() {
        let r = EventRecorder::new();
        r.log_navigation("/", "/login", None);
        assert_eq!(r.current_screen(), "/login");
        assert!(r.is_empty());
    }

    #[test]
    fn custom_uses_name_as_widget_key() {
        let r = recording();
        r.log_custom("purchase", Some("sku-1"), None);
        let e = r.events().pop().unwrap();
        assert_eq!(e.event_type, EventType::Custom);
        assert_eq!(e.widget_key.as_deref(), Some("purchase"));
        assert_eq!(e.value.as_deref(), Some("sku-1"));
    }

    #[test]
    fn dialog_and_sheet_have_their_own_tags() {
        let r = recording();
        r.log_dialog("confirm", Some("opened"), None);
        r.log_bottom_sheet("share", None, None);
        let stats = r.event_statistics();
        assert_eq!(stats.get(&EventType::Dialog), Some(&1));
        assert_eq!(stats.get(&EventType::BottomSheet), Some(&1));
    }

    #[test]
    fn clear_keeps_recording() {
        let r = recording();
        r.clear();
        assert!(r.is_recording());
        assert_eq!(r.len(), 0);
        r.log_tap("btn", None);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn filters_preserve_order() {
        let r = recording();
        r.log_tap("1", None);
        r.update_current_screen("/other");
        r.log_tap("2", None);
        r.update_current_screen("/");
        r.log_tap("3", None);

        let keys: Vec<_> = r
            .events_by_type(&EventType::Tap)
            .into_iter()
            .filter_map(|e| e.widget_key)
            .collect();
        assert_eq!(keys, vec!["1", "2", "3"]);

        let home: Vec<_> = r
            .events_by_screen("/")
            .into_iter()
            .filter_map(|e| e.widget_key)
            .collect();
        assert_eq!(home, vec!["1", "3"]);
    }

    #[test]
    fn statistics_omit_zero_counts() {
        let r = recording();
        r.clear();
        for _ in 0..3 {
            r.log_tap("t", None);
        }
        r.log_scroll("s", "down", 1.0, None);
        r.log_scroll("s", "up", 1.0, None);
        let stats = r.event_statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&EventType::Tap], 3);
        assert_eq!(stats[&EventType::Scroll], 2);
    }

    #[test]
    fn update_config_does_not_refilter() {
        let r = recording();
        r.log_tap("t", None);
        r.update_config(RecorderConfig::default().without_type(&EventType::Tap));
        assert_eq!(r.events_by_type(&EventType::Tap).len(), 1);
        r.log_tap("t", None);
        assert_eq!(r.events_by_type(&EventType::Tap).len(), 1);
    }

    #[test]
    fn export_ignores_current_config() {
        let r = recording();
        r.log_tap("t", None);
        r.update_config(RecorderConfig::default().with_enabled_types([]));
        let parsed: Vec<InteractionEvent> = serde_json::from_str(&r.export_to_json()).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn failed_load_keeps_buffer() {
        let r = recording();
        r.log_tap("t", None);
        let before = r.events();
        let err = r.load_from_json(r#"[{"type":"tap"}]"#).unwrap_err();
        assert!(err.is_parse_failure());
        assert!(r.load_from_json("not json").is_err());
        assert!(r.load_from_json(r#"{"type":"tap"}"#).is_err());
        assert_eq!(r.events(), before);
    }

    #[test]
    fn load_replaces_buffer() {
        let r = recording();
        r.log_tap("t", None);
        assert_eq!(r.load_from_json("[]").unwrap(), 0);
        assert!(r.is_empty());
        assert!(r.is_recording());
    }

    #[test]
    fn notifications_follow_mutations() {
        let r = EventRecorder::new();
        let rx = r.watch();
        r.log_tap("ignored", None);
        r.update_current_screen("/x");
        r.start();
        r.log_tap("t", None);
        r.update_config(RecorderConfig::default().without_type(&EventType::Tap));
        r.log_tap("filtered", None);
        r.clear();
        let _ = r.load_from_json("oops");
        r.load_from_json("[]").unwrap();
        r.stop();

        let got: Vec<Change> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                Change::Started,
                Change::EventLogged,
                Change::ConfigUpdated,
                Change::Cleared,
                Change::Loaded,
                Change::Stopped,
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_callbacks() {
        let r = EventRecorder::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = r.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        r.start();
        assert!(r.unsubscribe(id));
        assert!(!r.unsubscribe(id));
        r.log_tap("t", None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_watch_receiver_is_pruned() {
        let r = EventRecorder::new();
        drop(r.watch());
        assert_eq!(r.observer_count(), 1);
        r.start();
        assert_eq!(r.observer_count(), 0);
    }

    #[test]
    fn observer_can_read_recorder() {
        let r = Arc::new(EventRecorder::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let (r2, s2) = (Arc::downgrade(&r), seen.clone());
        r.subscribe(move |_| {
            if let Some(r) = r2.upgrade() {
                s2.store(r.len(), Ordering::SeqCst);
            }
        });
        r.start();
        r.log_tap("t", None);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exceeding_max_events_does_not_evict() {
        let r = EventRecorder::with_config(RecorderConfig {
            max_events: 2,
            ..Default::default()
        });
        r.start();
        for _ in 0..5 {
            r.log_tap("t", None);
        }
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let r = Arc::new(recording());
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let r = r.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        r.log_tap(&format!("{}-{}", i, j), None);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(r.len(), 201);
    }

    #[test]
    fn taps_carry_the_screen_of_the_preceding_navigation() {
        let r = Arc::new(recording());
        let navigator = {
            let r = r.clone();
            std::thread::spawn(move || {
                let mut from = DEFAULT_SCREEN.to_string();
                for n in 0..200 {
                    let to = format!("/screen{}", n);
                    r.log_navigation(&from, &to, None);
                    from = to;
                }
            })
        };
        let tappers: Vec<_> = (0..3)
            .map(|i| {
                let r = r.clone();
                std::thread::spawn(move || {
                    for j in 0..200 {
                        r.log_tap(&format!("{}-{}", i, j), None);
                    }
                })
            })
            .collect();
        navigator.join().unwrap();
        for t in tappers {
            t.join().unwrap();
        }

        let mut screen = DEFAULT_SCREEN.to_string();
        for e in r.events() {
            match e.event_type {
                EventType::Navigation => {
                    assert_eq!(e.screen, screen);
                    screen = e.value.clone().unwrap();
                }
                EventType::Tap => assert_eq!(e.screen, screen),
                _ => {}
            }
        }
        assert_eq!(r.len(), 1 + 200 + 600);
    }
}
