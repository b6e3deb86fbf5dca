/// An incremental parser for `text/event-stream` bodies.
///
/// Chunks arrive at arbitrary boundaries, so the parser buffers bytes until
/// it has complete lines and yields the data payload of every finished event.
pub struct SseParser {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            data_lines: Vec::new(),
        }
    }

    /// Feeds raw bytes, returning the payload of every event they complete
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();

        while let Some(position) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=position).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            // A blank line ends the event
            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }

                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                self.data_lines
                    .push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }

            // Everything else (comments, ids, event names) is ignored
        }

        events
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();

        let events = parser.push(b"data: {\"hello\":1}\n\n");
        assert_eq!(events, vec!["{\"hello\":1}".to_string()]);
    }

    #[test]
    fn test_chunks_split_mid_line() {
        let mut parser = SseParser::new();

        assert!(parser.push(b"data: {\"hel").is_empty());
        assert!(parser.push(b"lo\":1}\n").is_empty());

        let events = parser.push(b"\n");
        assert_eq!(events, vec!["{\"hello\":1}".to_string()]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut parser = SseParser::new();

        let events = parser.push(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_comments_and_fields_are_ignored() {
        let mut parser = SseParser::new();

        let events = parser.push(b": keepalive\n\nevent: change\nid: 4\ndata: payload\n\n");
        assert_eq!(events, vec!["payload".to_string()]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();

        let events = parser.push(b"data: payload\r\n\r\n");
        assert_eq!(events, vec!["payload".to_string()]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();

        let events = parser.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
    }
}
