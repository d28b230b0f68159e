/// Incremental decoder for `text/event-stream` bodies: feed raw bytes,
/// get back the complete `data:` payloads they finish. A partial
/// trailing line is buffered until the next feed.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = line.strip_prefix("data:") {
                let payload = payload.trim();
                if !payload.is_empty() {
                    payloads.push(payload.to_string());
                }
            }
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data:{\"a\":1}\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_multiple_events_one_feed() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data:one\ndata:two\n\ndata:three\n");
        assert_eq!(payloads, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_event_split_across_feeds() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data:{\"partial\"").is_empty());
        let payloads = decoder.feed(b":true}\n");
        assert_eq!(payloads, vec!["{\"partial\":true}"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data:hello\r\ndata:world\r\n");
        assert_eq!(payloads, vec!["hello", "world"]);
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"id:42\nevent:result\ndata:payload\n:comment\n");
        assert_eq!(payloads, vec!["payload"]);
    }

    #[test]
    fn test_empty_data_line_is_skipped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data:\ndata:   \n").is_empty());
    }

    #[test]
    fn test_data_with_space_after_colon() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: spaced\n");
        assert_eq!(payloads, vec!["spaced"]);
    }
}
