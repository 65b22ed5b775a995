//! Recorder configuration
//!
//! Replaced wholesale on update. Partial JSON documents fill in defaults.

use crate::events::EventType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Types that pass the logging gate
    pub enabled_event_types: BTreeSet<EventType>,
    /// Hint for callers masking text input
    pub include_sensitive_data: bool,
    /// Advisory buffer size; exceeding it is logged, never enforced
    pub max_events: usize,
    pub auto_save: bool,
    /// Seconds between autosaves
    pub auto_save_interval: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled_event_types: EventType::ALL.into_iter().collect(),
            include_sensitive_data: false,
            max_events: 1000,
            auto_save: false,
            auto_save_interval: 60,
        }
    }
}

impl RecorderConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn is_enabled(&self, event_type: &EventType) -> bool {
        self.enabled_event_types.contains(event_type)
    }

    pub fn with_enabled_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.enabled_event_types = types.into_iter().collect();
        self
    }

    pub fn without_type(mut self, event_type: &EventType) -> Self {
        self.enabled_event_types.remove(event_type);
        self
    }
}
