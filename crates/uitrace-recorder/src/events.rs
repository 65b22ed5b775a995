//! Interaction event types
//!
//! Events serialize to flat JSON objects with explicit `null`s so an export
//! can be loaded back field-for-field.

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Free-form event annotations
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Kind of interaction, serialized as a snake_case tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Tap,
    LongPress,
    TextInput,
    Scroll,
    Navigation,
    Dialog,
    BottomSheet,
    Custom,
    /// Any tag outside the known vocabulary
    Other(String),
}

impl EventType {
    /// Every known tag, in declaration order
    pub const ALL: [EventType; 8] = [
        EventType::Tap,
        EventType::LongPress,
        EventType::TextInput,
        EventType::Scroll,
        EventType::Navigation,
        EventType::Dialog,
        EventType::BottomSheet,
        EventType::Custom,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventType::Tap => "tap",
            EventType::LongPress => "long_press",
            EventType::TextInput => "text_input",
            EventType::Scroll => "scroll",
            EventType::Navigation => "navigation",
            EventType::Dialog => "dialog",
            EventType::BottomSheet => "bottom_sheet",
            EventType::Custom => "custom",
            EventType::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "tap" => EventType::Tap,
            "long_press" => EventType::LongPress,
            "text_input" => EventType::TextInput,
            "scroll" => EventType::Scroll,
            "navigation" => EventType::Navigation,
            "dialog" => EventType::Dialog,
            "bottom_sheet" => EventType::BottomSheet,
            "custom" => EventType::Custom,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::from(s))
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EventType::from(tag.as_str()))
    }
}

/// Single recorded interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Route active when the event happened
    pub screen: String,
    #[serde(rename = "widgetKey")]
    pub widget_key: Option<String>,
    pub value: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub meta: Option<Meta>,
}

impl InteractionEvent {
    /// New event stamped with the current local time
    pub fn new(event_type: EventType, screen: impl Into<String>) -> Self {
        Self {
            event_type,
            screen: screen.into(),
            widget_key: None,
            value: None,
            timestamp: now(),
            meta: None,
        }
    }

    pub fn with_widget_key(mut self, key: impl Into<String>) -> Self {
        self.widget_key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_meta(mut self, meta: Option<Meta>) -> Self {
        self.meta = meta;
        self
    }

    /// Explicit timestamp, truncated to milliseconds
    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp.trunc_subsecs(3);
        self
    }
}

/// Local wall-clock time truncated to what the wire format keeps
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(3)
}

/// ISO-8601 timestamps with millisecond precision and no offset
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SubsecRound};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts any fractional precision, and RFC 3339 with an offset.
    /// Digits past the millisecond are dropped so a parsed value formats back
    /// to the same instant.
    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc()))
            .map(|ts| ts.trunc_subsecs(3))
    }
}
