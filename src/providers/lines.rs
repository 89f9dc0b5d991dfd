//! Line framing for streamed HTTP bodies (NDJSON and SSE).

use futures_util::{Stream, StreamExt, pin_mut};

use crate::{HuginnError, Result};

/// Split a streaming response body into trimmed, non-empty text lines.
///
/// Network chunks may end mid-line; partial lines are held until their
/// newline arrives. A final line without a trailing newline is still
/// yielded when the body ends.
pub(crate) fn response_lines(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String>> + Send + 'static {
    async_stream::try_stream! {
        let bytes = response.bytes_stream();
        pin_mut!(bytes);
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| HuginnError::Stream(e.to_string()))?;
            pending.extend_from_slice(&chunk);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=pos).collect();
                if let Some(line) = decode_line(&raw)? {
                    yield line;
                }
            }
        }

        if let Some(line) = decode_line(&pending)? {
            yield line;
        }
    }
}

/// Decode one raw line. Lines are split on `\n` only, which never occurs
/// inside a UTF-8 multibyte sequence.
fn decode_line(raw: &[u8]) -> Result<Option<String>> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| HuginnError::Stream(format!("invalid UTF-8 in stream: {e}")))?;
    let line = line.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

/// Payload of a server-sent-events `data:` line, if `line` is one.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}
