//! uitrace-recorder - in-memory interaction recording
//!
//! Widget adapters call the `log_*` methods on a shared [`EventRecorder`];
//! the recorder gates, buffers and exports the events as JSON.
//!
//! ```
//! use uitrace_recorder::prelude::*;
//!
//! let recorder = EventRecorder::new();
//! recorder.start();
//! recorder.log_tap("login_button", None);
//! recorder.log_navigation("/", "/home", None);
//! recorder.stop();
//!
//! let json = recorder.export_to_json();
//! assert_eq!(recorder.len(), 4);
//! assert!(json.contains("login_button"));
//! ```

pub mod autosave;
pub mod config;
pub mod error;
pub mod events;
pub mod masking;
pub mod recorder;
pub mod storage;

pub use autosave::AutoSaver;
pub use config::RecorderConfig;
pub use error::{Error, ErrorCode, Result};
pub use events::*;
pub use masking::{mask_text, SENSITIVE_PLACEHOLDER};
pub use recorder::{statistics, Change, EventRecorder, Receiver, SubscriptionId};
pub use storage::{ExportStorage, ExportTarget};

pub mod prelude {
    pub use crate::autosave::AutoSaver;
    pub use crate::config::RecorderConfig;
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::events::{EventType, InteractionEvent, Meta};
    pub use crate::masking::mask_text;
    pub use crate::recorder::{Change, EventRecorder, Receiver, SubscriptionId};
    pub use crate::storage::{ExportStorage, ExportTarget};
}
