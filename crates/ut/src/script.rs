//! Interaction scripts - one interaction per line
//!
//! ```text
//! # comment
//! tap login_button
//! text email alice@example.com
//! secret password hunter2
//! scroll feed down 240
//! nav / /home
//! ```

use anyhow::{anyhow, bail, Context, Result};
use uitrace::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Tap(String),
    LongPress(String),
    Text { key: String, value: String },
    /// Text input masked unless `includeSensitiveData` is on
    Secret { key: String, value: String },
    Scroll { key: String, direction: String, distance: f64 },
    Nav { from: String, to: String },
    Screen(String),
    Dialog { key: String, value: Option<String> },
    Sheet { key: String, value: Option<String> },
    Custom { name: String, value: Option<String> },
    Clear,
}

impl Step {
    /// Returns whether the recorder kept an event
    pub fn apply(&self, recorder: &EventRecorder) -> bool {
        match self {
            Step::Tap(key) => recorder.log_tap(key, None),
            Step::LongPress(key) => recorder.log_long_press(key, None),
            Step::Text { key, value } => recorder.log_text_input(key, value, None),
            Step::Secret { key, value } => {
                let config = recorder.config();
                recorder.log_text_input(key, mask_text(&config, value, true), None)
            }
            Step::Scroll { key, direction, distance } => {
                recorder.log_scroll(key, direction, *distance, None)
            }
            Step::Nav { from, to } => recorder.log_navigation(from, to, None),
            Step::Screen(name) => {
                recorder.update_current_screen(name);
                false
            }
            Step::Dialog { key, value } => recorder.log_dialog(key, value.as_deref(), None),
            Step::Sheet { key, value } => recorder.log_bottom_sheet(key, value.as_deref(), None),
            Step::Custom { name, value } => recorder.log_custom(name, value.as_deref(), None),
            Step::Clear => {
                recorder.clear();
                false
            }
        }
    }
}

pub fn parse(text: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(step) = parse_line(line).with_context(|| format!("line {}", i + 1))? {
            steps.push(step);
        }
    }
    Ok(steps)
}

pub fn parse_line(line: &str) -> Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };

    let step = match cmd {
        "tap" => Step::Tap(arg(&mut words, cmd, "widget key")?),
        "long_press" => Step::LongPress(arg(&mut words, cmd, "widget key")?),
        "text" => {
            let key = arg(&mut words, cmd, "widget key")?;
            Step::Text { key, value: rest(&mut words) }
        }
        "secret" => {
            let key = arg(&mut words, cmd, "widget key")?;
            Step::Secret { key, value: rest(&mut words) }
        }
        "scroll" => {
            let key = arg(&mut words, cmd, "widget key")?;
            let direction = arg(&mut words, cmd, "direction")?;
            let distance = arg(&mut words, cmd, "distance")?;
            let distance = distance
                .parse::<f64>()
                .with_context(|| format!("scroll: bad distance '{}'", distance))?;
            Step::Scroll { key, direction, distance }
        }
        "nav" => {
            let from = arg(&mut words, cmd, "source screen")?;
            let to = arg(&mut words, cmd, "target screen")?;
            Step::Nav { from, to }
        }
        "screen" => Step::Screen(arg(&mut words, cmd, "screen")?),
        "dialog" => {
            let key = arg(&mut words, cmd, "widget key")?;
            Step::Dialog { key, value: optional(&mut words) }
        }
        "sheet" => {
            let key = arg(&mut words, cmd, "widget key")?;
            Step::Sheet { key, value: optional(&mut words) }
        }
        "custom" => {
            let name = arg(&mut words, cmd, "name")?;
            Step::Custom { name, value: optional(&mut words) }
        }
        "clear" => Step::Clear,
        other => bail!("unknown command '{}'", other),
    };
    Ok(Some(step))
}

fn arg<'a>(words: &mut impl Iterator<Item = &'a str>, cmd: &str, what: &str) -> Result<String> {
    words
        .next()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{}: missing {}", cmd, what))
}

fn rest<'a>(words: &mut impl Iterator<Item = &'a str>) -> String {
    words.collect::<Vec<_>>().join(" ")
}

fn optional<'a>(words: &mut impl Iterator<Item = &'a str>) -> Option<String> {
    Some(rest(words)).filter(|s| !s.is_empty())
}
