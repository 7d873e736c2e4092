/// Incremental server-sent-events decoder.
///
/// Feed raw body bytes with `push`; complete `data:` payloads come back in
/// arrival order. Partial lines are kept as raw bytes until their newline
/// arrives, so a multi-byte character split across chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);

            if let Some(payload) = data_payload(line.trim()) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }

    /// Payload of a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&bytes);
        data_payload(line.trim()).map(str::to_string)
    }
}

fn data_payload(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.push(b":1}\r\n\r\ndata: {\"b\":2}\n"), vec![
            r#"{"a":1}"#.to_string(),
            r#"{"b":2}"#.to_string()
        ]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let body = "data: {\"t\":\"café — ok\"}\n".as_bytes();
        let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&body[..cut]).is_empty());
        assert_eq!(
            decoder.push(&body[cut..]),
            vec![r#"{"t":"café — ok"}"#.to_string()]
        );
    }

    #[test]
    fn test_ignores_comments_and_done() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b": keepalive\nevent: message\ndata: [DONE]\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"c\":3}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"c":3}"#));
        assert!(decoder.finish().is_none());
    }
}
