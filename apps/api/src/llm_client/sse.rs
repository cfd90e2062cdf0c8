use serde_json::Value;

/// Splits every complete (`\n\n`-terminated) server-sent event off the front
/// of `buffer` and returns the JSON payloads of their `data:` lines.
/// An incomplete trailing event stays in the buffer for the next read.
pub(crate) fn drain_sse_events(buffer: &mut String) -> Vec<Value> {
    let mut events = Vec::new();

    while let Some(idx) = buffer.find("\n\n") {
        let packet: String = buffer.drain(..idx + 2).collect();

        for line in packet.lines() {
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };

            let data = data.trim();
            if data.is_empty() || data == "[DONE]" {
                continue;
            }

            if let Ok(value) = serde_json::from_str::<Value>(data) {
                events.push(value);
            }
        }
    }

    events
}
