use crate::api::logging::emit_sse_parse_error;
use crate::types::StreamEvent;
use anyhow::Result;

/// Incremental SSE decoder for the chat stream. Frames may arrive split
/// across arbitrary chunk boundaries; bytes are buffered until a full
/// `\n\n`-terminated event is available.
#[derive(Default)]
pub struct StreamParser {
    buffer: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find("\n\n") {
            let event_end = start + end + 2;
            let event_text = &self.buffer[start..event_end];

            let mut event_type = None;
            let mut data = None;

            for line in event_text.lines() {
                if let Some(rest) = line.strip_prefix("event: ") {
                    event_type = Some(rest.to_string());
                } else if let Some(rest) = line.strip_prefix("data: ") {
                    data = Some(rest.trim().to_string());
                }
            }

            if let Some(json_data) = data {
                if json_data == "[DONE]" {
                    start = event_end;
                    continue;
                }

                match serde_json::from_str::<StreamEvent>(&json_data) {
                    Ok(event) => events.push(event),
                    Err(parse_error) => {
                        emit_sse_parse_error(event_type.as_deref(), &json_data, &parse_error);
                    }
                }
            }

            start = event_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(events)
    }
}
