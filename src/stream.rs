//! Incremental decoding of chunked text bodies.
//!
//! Chunk boundaries from the network fall anywhere, including in the middle
//! of a multibyte character or a line, so both decoders here carry the
//! unfinished tail over to the next chunk.

use bytes::Bytes;
use futures::{ Stream, StreamExt };
use log::debug;

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `chunk` as forms complete characters. An incomplete
    /// trailing sequence is held until the next call; invalid bytes become
    /// U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // valid_up_to marks a char boundary
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flushes whatever is still held. A truncated sequence at end of stream
    /// decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Done,
}

/// Accumulates a streamed text response into a single buffer.
#[derive(Debug)]
pub struct ResponseReader {
    decoder: Utf8ChunkDecoder,
    text: String,
    state: StreamState,
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self {
            decoder: Utf8ChunkDecoder::new(),
            text: String::new(),
            state: StreamState::Streaming,
        }
    }
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one chunk, appends it and returns the newly decoded piece.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        if self.state == StreamState::Done {
            return String::new();
        }
        let delta = self.decoder.decode(chunk);
        self.text.push_str(&delta);
        delta
    }

    /// Marks the end of stream and returns any trailing piece.
    pub fn finish(&mut self) -> String {
        if self.state == StreamState::Done {
            return String::new();
        }
        let tail = self.decoder.finish();
        self.text.push_str(&tail);
        self.state = StreamState::Done;
        tail
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Reads `stream` until it ends, decoding and appending each chunk and
/// reporting every non-empty decoded piece to `on_delta`. The first error
/// item ends the read.
pub async fn accumulate<S, E, F>(mut stream: S, mut on_delta: F) -> Result<String, E>
    where S: Stream<Item = Result<Bytes, E>> + Unpin, F: FnMut(&str)
{
    let mut reader = ResponseReader::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        debug!("Received {} byte chunk", chunk.len());
        let delta = reader.push(&chunk);
        if !delta.is_empty() {
            on_delta(&delta);
        }
    }

    let tail = reader.finish();
    if !tail.is_empty() {
        on_delta(&tail);
    }

    Ok(reader.into_text())
}

/// Splits a chunked byte stream into complete lines. A trailing `\r` is
/// stripped from each line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    decoder: Utf8ChunkDecoder,
    partial: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.push_str(&self.decoder.decode(chunk));
        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let mut line: String = self.partial.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Returns the unterminated last line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.partial.push_str(&self.decoder.finish());
        if self.partial.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.partial);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn multibyte_character_split_across_chunks() {
        let text = "héllo wörld 👋";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = Utf8ChunkDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, text, "split at {}", split);
        }
    }

    #[test]
    fn byte_at_a_time() {
        let text = "日本語のテキスト";
        let mut decoder = Utf8ChunkDecoder::new();
        let mut out = String::new();
        for b in text.as_bytes() {
            out.push_str(&decoder.decode(std::slice::from_ref(b)));
        }
        assert!(!decoder.has_pending());
        assert_eq!(out, text);
    }

    #[test]
    fn invalid_bytes_become_replacement() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_sequence_flushes_as_replacement() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn reader_stops_appending_after_done() {
        let mut reader = ResponseReader::new();
        assert_eq!(reader.state(), StreamState::Streaming);
        assert_eq!(reader.push(b"Hel"), "Hel");
        assert_eq!(reader.push(b"lo"), "lo");
        reader.finish();
        assert_eq!(reader.state(), StreamState::Done);
        assert_eq!(reader.push(b"!"), "");
        assert_eq!(reader.text(), "Hello");
    }

    #[tokio::test]
    async fn accumulate_reports_deltas_in_order() {
        let euro = "€".as_bytes();
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"Price: ")),
            Ok(Bytes::copy_from_slice(&euro[..2])),
            Ok(Bytes::copy_from_slice(&euro[2..])),
            Ok(Bytes::from_static(b"5")),
        ];
        let mut deltas = Vec::new();
        let text = accumulate(stream::iter(chunks), |d| deltas.push(d.to_string())).await.unwrap();
        assert_eq!(text, "Price: €5");
        assert_eq!(deltas, vec!["Price: ", "€", "5"]);
    }

    #[tokio::test]
    async fn accumulate_empty_stream() {
        let chunks: Vec<Result<Bytes, String>> = vec![];
        let text = accumulate(stream::iter(chunks), |_| panic!("no delta expected")).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn accumulate_stops_at_error() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"never")),
        ];
        let err = accumulate(stream::iter(chunks), |_| {}).await.unwrap_err();
        assert_eq!(err, "connection reset");
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut lines = LineBuffer::new();
        assert!(lines.push(b"data: {\"a\"").is_empty());
        assert_eq!(lines.push(b":1}\r\ndata: [DO"), vec!["data: {\"a\":1}"]);
        assert_eq!(lines.push(b"NE]\n\n"), vec!["data: [DONE]", ""]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn line_buffer_returns_unterminated_tail() {
        let mut lines = LineBuffer::new();
        assert!(lines.push(b"{\"done\":true}").is_empty());
        assert_eq!(lines.finish().as_deref(), Some("{\"done\":true}"));
    }
}
