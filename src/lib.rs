//! # uitrace
//!
//! Interaction-event recording for UI hosts.
//!
//! Widget adapters forward taps, text input, scrolls and navigations to a
//! shared [`EventRecorder`]; the recorder filters, buffers and exports them
//! as a JSON array that loads back field-for-field.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use uitrace::prelude::*;
//!
//! let recorder = Arc::new(EventRecorder::new());
//! let changes = recorder.watch();
//!
//! recorder.start();
//! recorder.log_tap("login_button", None);
//! recorder.log_text_input("password", mask_text(&recorder.config(), "hunter2", true), None);
//! recorder.stop();
//!
//! assert_eq!(changes.try_iter().count(), 4);
//! assert_eq!(recorder.event_statistics()[&EventType::Custom], 2);
//! ```

// Re-export the recorder crate
pub use uitrace_recorder as recorder;

pub use uitrace_recorder::{
    mask_text, statistics, AutoSaver, Change, Error, ErrorCode, EventRecorder, EventType,
    ExportStorage, ExportTarget, InteractionEvent, Meta, RecorderConfig, Result,
    SubscriptionId,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use uitrace_recorder::prelude::*;
}
