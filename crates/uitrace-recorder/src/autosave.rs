//! Periodic export while recording
//!
//! A background thread writes the buffer to a fixed file name every
//! `autoSaveInterval` seconds. It only saves while the recorder is
//! recording and `autoSave` is still on in the live config.

use crate::recorder::EventRecorder;
use crate::storage::ExportTarget;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

pub const AUTOSAVE_NAME: &str = "autosave";

/// Autosave handle - stops the thread when stopped or dropped
pub struct AutoSaver {
    stop_tx: Option<Sender<()>>,
    running: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AutoSaver {
    /// Starts autosaving per the recorder's config. `None` if `autoSave` is off.
    pub fn spawn(recorder: Arc<EventRecorder>, target: Arc<dyn ExportTarget>) -> Option<Self> {
        let config = recorder.config();
        if !config.auto_save {
            return None;
        }
        let interval = Duration::from_secs(config.auto_save_interval.max(1));
        Some(Self::spawn_every(recorder, target, interval, AUTOSAVE_NAME))
    }

    pub fn spawn_every(
        recorder: Arc<EventRecorder>,
        target: Arc<dyn ExportTarget>,
        interval: Duration,
        name: &str,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let saves = Arc::new(AtomicUsize::new(0));
        let name = name.to_string();

        let running1 = running.clone();
        let saves1 = saves.clone();
        let thread = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // stop signal or handle gone
                    _ => break,
                }
                if !recorder.is_recording() || !recorder.config().auto_save {
                    continue;
                }
                if recorder.export_to_file(target.as_ref(), &name).is_some() {
                    let n = saves1.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(saves = n, "autosaved");
                }
            }
            running1.store(false, Ordering::SeqCst);
        });

        Self {
            stop_tx: Some(stop_tx),
            running,
            saves,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
