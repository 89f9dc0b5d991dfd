//! Removal of `<think>...</think>` reasoning spans from model output.
//!
//! Models such as deepseek-r1 or qwq emit their chain of thought inline,
//! bracketed by `<think>` tags. None of it should reach the user.
//!
//! Three entry points share one state machine ([`ThinkFilter`]):
//!
//! - [`ThinkFilter::process`] / [`ThinkFilter::flush`]: incremental,
//!   for text arriving in arbitrary chunks. Never emits partial tag text.
//! - [`strip_think_tags`]: one-shot, for complete batch responses.
//! - [`ThinkFilterStream`]: a [`Stream`] adapter over provider chunk
//!   streams, used by the engine on the streaming path.
//!
//! Tags do not nest: the first `<think>` pairs with the first `</think>`
//! after it. An opening tag that is never closed is kept and surfaced
//! verbatim by `flush()`.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::Result;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Incremental `<think>` span filter.
///
/// ```rust
/// # use huginn::filter::ThinkFilter;
/// let mut filter = ThinkFilter::new();
/// let mut out = filter.process("<thi");
/// out += &filter.process("nk>hidden");
/// out += &filter.process("</think>visible");
/// out += &filter.flush();
/// assert_eq!(out, "visible");
/// ```
#[derive(Debug, Default, Clone)]
pub struct ThinkFilter {
    /// Unconsumed tail: an open span awaiting its close tag, or a trailing
    /// prefix of `<think>`.
    buffer: String,
    inside: bool,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an opening tag has been seen without its closing tag.
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Feed a chunk and return whatever can be emitted now.
    pub fn process(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        let mut out = String::new();

        loop {
            if self.inside {
                // Buffer starts at the opening tag; the close search covers
                // everything after it.
                match self.buffer.find(CLOSE_TAG) {
                    Some(pos) => {
                        self.buffer.drain(..pos + CLOSE_TAG.len());
                        self.inside = false;
                    }
                    None => return out,
                }
                continue;
            }

            match self.buffer.find(OPEN_TAG) {
                Some(pos) => {
                    out.push_str(&self.buffer[..pos]);
                    self.buffer.drain(..pos);
                    self.inside = true;
                }
                None => {
                    let emit_to = self.buffer.len() - partial_open_tag_len(&self.buffer);
                    out.push_str(&self.buffer[..emit_to]);
                    self.buffer.drain(..emit_to);
                    return out;
                }
            }
        }
    }

    /// Return and clear everything still buffered.
    ///
    /// Non-empty output here means the stream ended inside an unterminated
    /// `<think>` span or on a partial tag.
    pub fn flush(&mut self) -> String {
        self.inside = false;
        std::mem::take(&mut self.buffer)
    }
}

/// Length of the longest proper prefix of `<think>` that `text` ends with.
///
/// The prefix is ASCII, so `text.len() - n` is always a char boundary.
fn partial_open_tag_len(text: &str) -> usize {
    (1..OPEN_TAG.len())
        .rev()
        .find(|&n| text.ends_with(&OPEN_TAG[..n]))
        .unwrap_or(0)
}

/// Remove every complete `<think>...</think>` span from `text`.
///
/// An unterminated opening tag and everything after it is left in place.
pub fn strip_think_tags(text: &str) -> String {
    let mut filter = ThinkFilter::new();
    let mut out = filter.process(text);
    out.push_str(&filter.flush());
    out
}

pin_project! {
    /// Stream adapter applying a [`ThinkFilter`] to a stream of text chunks.
    ///
    /// Yields only non-empty filtered chunks, in input order. When the
    /// inner stream ends, the filter's flush remainder (if any) is yielded
    /// as the final item. Errors pass through unchanged.
    pub struct ThinkFilterStream<S> {
        #[pin]
        inner: S,
        filter: ThinkFilter,
        finished: bool,
    }
}

impl<S> ThinkFilterStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            filter: ThinkFilter::new(),
            finished: false,
        }
    }
}

impl<S> Stream for ThinkFilterStream<S>
where
    S: Stream<Item = Result<String>>,
{
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if *this.finished {
                return Poll::Ready(None);
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let out = this.filter.process(&chunk);
                    if !out.is_empty() {
                        return Poll::Ready(Some(Ok(out)));
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    *this.finished = true;
                    let rest = this.filter.flush();
                    if !rest.is_empty() {
                        return Poll::Ready(Some(Ok(rest)));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_chunks(chunks: &[&str]) -> String {
        let mut filter = ThinkFilter::new();
        let mut out: String = chunks.iter().map(|c| filter.process(c)).collect();
        out.push_str(&filter.flush());
        out
    }

    #[test]
    fn single_span_removed() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("<think>a</think>b"), "b");
        assert!(!filter.is_inside());
    }

    #[test]
    fn multiple_spans_in_one_chunk() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("x<think>a</think>y<think>c</think>z"), "xyz");
    }

    #[test]
    fn open_tag_split_across_chunks() {
        assert_eq!(run_chunks(&["<thi", "nk>hidden", "</think>visible"]), "visible");
    }

    #[test]
    fn close_tag_split_across_chunks() {
        assert_eq!(run_chunks(&["a<think>x</thi", "nk>b"]), "ab");
    }

    #[test]
    fn partial_tag_is_held_back() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("text<thi"), "text");
        assert_eq!(filter.flush(), "<thi");
    }

    #[test]
    fn lone_angle_bracket_is_held_then_released() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("a <"), "a ");
        assert_eq!(filter.process(" b"), "< b");
    }

    #[test]
    fn non_tag_markup_passes_through() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("<thing>x</thing>"), "<thing>x</thing>");
    }

    #[test]
    fn unterminated_span_surfaces_on_flush() {
        let mut filter = ThinkFilter::new();
        assert_eq!(filter.process("ok <think>never closed"), "ok ");
        assert!(filter.is_inside());
        assert_eq!(filter.flush(), "<think>never closed");
        assert!(!filter.is_inside());
    }

    #[test]
    fn strip_handles_multibyte_text() {
        assert_eq!(strip_think_tags("héllo<think>…</think> wörld ✓"), "héllo wörld ✓");
    }

    #[test]
    fn strip_leaves_unterminated_tag() {
        assert_eq!(strip_think_tags("a<think>b"), "a<think>b");
    }

    #[test]
    fn partial_len_finds_longest_prefix() {
        assert_eq!(partial_open_tag_len("abc<think"), 6);
        assert_eq!(partial_open_tag_len("abc<"), 1);
        assert_eq!(partial_open_tag_len("abc"), 0);
        assert_eq!(partial_open_tag_len(""), 0);
    }
}
