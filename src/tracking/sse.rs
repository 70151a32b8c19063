//! Incremental `text/event-stream` decoder.

use tracing::warn;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// Event name, `message` when the server did not name it.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Longest line kept; longer lines are dropped whole.
pub const MAX_LINE_BYTES: usize = 256 * 1024;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Turns arbitrarily split byte chunks into events.
///
/// Lines end with `\r\n`, `\n` or a lone `\r`. A UTF-8 byte order mark at the
/// start of the stream is skipped. An event is dispatched on a blank line and
/// only when it carried at least one `data` field. A trailing event without
/// its blank line is never dispatched.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    after_cr: bool,
    overflowed: bool,
    started: bool,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\r' | b'\n' => {
                    self.after_cr = byte == b'\r';
                    if let Some(event) = self.end_line() {
                        events.push(event);
                    }
                }
                _ => {
                    self.after_cr = false;
                    self.push_byte(byte);
                }
            }
        }

        events
    }

    fn push_byte(&mut self, byte: u8) {
        if self.overflowed {
            return;
        }

        if self.line.len() >= MAX_LINE_BYTES {
            warn!(limit = MAX_LINE_BYTES, "Dropping oversized stream line");
            self.overflowed = true;
            self.line.clear();
            return;
        }

        self.line.push(byte);
    }

    fn end_line(&mut self) -> Option<SseEvent> {
        let skip = if !self.started && self.line.starts_with(BOM) {
            BOM.len()
        } else {
            0
        };
        self.started = true;

        if std::mem::take(&mut self.overflowed) {
            return None;
        }

        let line = String::from_utf8_lossy(&self.line[skip..]).into_owned();
        self.line.clear();
        self.process_line(&line)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();

        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STREAM: &str = concat!(
        "\u{feff}event:connected\n",
        "data:Connected to order ORD-1\n",
        "\n",
        ": keep-alive\n",
        "\n",
        "data: {\"orderId\":\"ORD-1\",\n",
        "data: \"status\":\"IN_WAREHOUSE\"}\n",
        "\n",
        "id: 7\r\n",
        "event: order-update\r\n",
        "data: {\"orderId\":\"ORD-1\",\"status\":\"IN_TRANSIT\",\"message\":\"Out for delivery \u{1f69a}\"}\r\n",
        "\r\n",
        "data: cr-only\r",
        "\r",
        "data: never dispatched",
    );

    fn expected() -> Vec<SseEvent> {
        vec![
            SseEvent {
                event: Some("connected".to_string()),
                data: "Connected to order ORD-1".to_string(),
                id: None,
            },
            SseEvent {
                event: None,
                data: "{\"orderId\":\"ORD-1\",\n\"status\":\"IN_WAREHOUSE\"}".to_string(),
                id: None,
            },
            SseEvent {
                event: Some("order-update".to_string()),
                data: "{\"orderId\":\"ORD-1\",\"status\":\"IN_TRANSIT\",\"message\":\"Out for delivery \u{1f69a}\"}"
                    .to_string(),
                id: Some("7".to_string()),
            },
            SseEvent {
                event: None,
                data: "cr-only".to_string(),
                id: Some("7".to_string()),
            },
        ]
    }

    #[test]
    fn test_decodes_whole_stream() {
        let mut decoder = SseDecoder::default();

        assert_eq!(decoder.feed(STREAM.as_bytes()), expected());
    }

    #[test]
    fn test_event_type_defaults_to_message() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: {}\n\nevent: order-update\ndata: {}\n\n");

        assert_eq!(events[0].event_type(), "message");
        assert_eq!(events[1].event_type(), "order-update");
    }

    #[test]
    fn test_event_name_without_data_is_reset() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"event: order-update\n\ndata: plain\n\n");

        assert_eq!(
            events,
            vec![SseEvent {
                event: None,
                data: "plain".to_string(),
                id: None,
            }]
        );
    }

    #[test]
    fn test_field_without_colon_and_unknown_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"retry: 3000\nfoo: bar\ndata\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }

    #[test]
    fn test_last_event_id_carries_over() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"id: 1\ndata: a\n\ndata: b\n\n");

        assert_eq!(events[1].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_lone_carriage_returns_end_lines() {
        let mut decoder = SseDecoder::default();
        let mut events = decoder.feed(b"event: order-update\rdata: a\r");
        events.extend(decoder.feed(b"\r\ndata: b\r\n\r\n"));

        assert_eq!(events.len(), 2, "{events:?}");
        assert_eq!(events[0].event_type(), "order-update");
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn test_bom_only_stripped_at_stream_start() {
        let mut decoder = SseDecoder::default();
        let mut events = decoder.feed(b"\xEF\xBB");
        events.extend(decoder.feed(b"\xBFdata: first\n\n"));
        events.extend(decoder.feed(b"\xEF\xBB\xBFdata: second\n\n"));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first");
    }

    #[test]
    fn test_oversized_line_is_dropped() {
        let mut decoder = SseDecoder::default();
        let mut oversized = b"data: ".to_vec();
        oversized.resize(MAX_LINE_BYTES + 10, b'x');

        let mut events = decoder.feed(&oversized);
        assert!(decoder.line.len() <= MAX_LINE_BYTES);
        events.extend(decoder.feed(b"\n\ndata: after\n\n"));

        assert_eq!(
            events,
            vec![SseEvent {
                event: None,
                data: "after".to_string(),
                id: None,
            }]
        );
    }

    proptest! {
        #[test]
        fn prop_chunk_boundaries_do_not_matter(cuts in prop::collection::vec(0..STREAM.len(), 0..12)) {
            let bytes = STREAM.as_bytes();
            let mut cuts = cuts;
            cuts.sort_unstable();
            cuts.dedup();

            let mut decoder = SseDecoder::default();
            let mut events = Vec::new();
            let mut start = 0;
            for cut in cuts {
                events.extend(decoder.feed(&bytes[start..cut]));
                start = cut;
            }
            events.extend(decoder.feed(&bytes[start..]));

            prop_assert_eq!(events, expected());
        }
    }
}
