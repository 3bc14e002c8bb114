use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

use crate::util::parse_bool_flag;

const DEFAULT_LOG_PATH: &str = "/tmp/quill-debug.log";
const DEBUG_PAYLOAD_ENV: &str = "QUILL_DEBUG_PAYLOAD";
const LOG_PATH_ENV: &str = "QUILL_LOG_PATH";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|v| parse_bool_flag(&v))
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message = format!("QUILL DEBUG request url={request_url}\npayload:\n{formatted}\n");
    emit_log_message(&message);
}

pub fn emit_sse_parse_error(event_type: Option<&str>, json_data: &str, parse_error: &serde_json::Error) {
    let message = format!(
        "QUILL ERROR sse_parse_failed error={parse_error}\nevent_type={}\ndata:\n{json_data}\n",
        event_type.unwrap_or("<none>")
    );
    emit_log_message(&message);
}

/// Non-critical failures (preference writes, suggestion fetches) land here
/// instead of surfacing as session errors.
pub fn emit_background_error(context: &str, error: &anyhow::Error) {
    let message = format!("QUILL WARN {context}: {error:#}\n");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
