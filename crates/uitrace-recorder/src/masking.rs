//! Caller-side masking for sensitive text input
//!
//! The recorder never masks on its own; input adapters run text through
//! `mask_text` before calling `log_text_input`.

use crate::config::RecorderConfig;

pub const SENSITIVE_PLACEHOLDER: &str = "[SENSITIVE]";

pub fn mask_text<'a>(config: &RecorderConfig, text: &'a str, sensitive: bool) -> &'a str {
    if sensitive && !config.include_sensitive_data {
        SENSITIVE_PLACEHOLDER
    } else {
        text
    }
}
