//! Tests for `<think>` span filtering, one-shot and incremental.

use futures_util::stream::{self, StreamExt};
use huginn::filter::{ThinkFilter, ThinkFilterStream, strip_think_tags};
use huginn::{HuginnError, Result};

/// Feed `chunks` through a fresh filter and return all output.
fn run_chunks(chunks: &[&str]) -> String {
    let mut filter = ThinkFilter::new();
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&filter.process(chunk));
    }
    out.push_str(&filter.flush());
    out
}

#[test]
fn text_without_tags_passes_through() {
    let mut filter = ThinkFilter::new();
    assert_eq!(filter.process("ls -la lists all files"), "ls -la lists all files");
    assert_eq!(filter.flush(), "");
}

#[test]
fn removes_single_span() {
    let mut filter = ThinkFilter::new();
    assert_eq!(filter.process("<think>a</think>b"), "b");
}

#[test]
fn removes_multiple_spans() {
    let mut filter = ThinkFilter::new();
    assert_eq!(filter.process("x<think>a</think>y<think>c</think>z"), "xyz");
}

#[test]
fn open_tag_split_across_chunks() {
    assert_eq!(run_chunks(&["<thi", "nk>hidden", "</think>visible"]), "visible");
}

#[test]
fn partial_open_tag_is_held_then_flushed() {
    let mut filter = ThinkFilter::new();
    assert_eq!(filter.process("text<thi"), "text");
    assert_eq!(filter.flush(), "<thi");
}

#[test]
fn lookalike_tags_are_kept() {
    assert_eq!(strip_think_tags("a <thing> b < c"), "a <thing> b < c");
}

#[test]
fn unterminated_span_is_surfaced() {
    assert_eq!(strip_think_tags("ok<think>never closed"), "ok<think>never closed");
}

#[test]
fn think_only_response_strips_to_nothing() {
    assert_eq!(strip_think_tags("<think>just reasoning</think>").trim(), "");
}

#[test]
fn chunking_does_not_change_output() {
    let text = "pre<think>one</think>mid <b> <think>two\nlines</think>post <thin";
    let expected = strip_think_tags(text);

    // Every two-way split, at char boundaries.
    for (i, _) in text.char_indices().skip(1) {
        let (a, b) = text.split_at(i);
        assert_eq!(run_chunks(&[a, b]), expected, "split at {i}");
    }

    // Single-character chunks.
    let singles: Vec<String> = text.chars().map(String::from).collect();
    let refs: Vec<&str> = singles.iter().map(String::as_str).collect();
    assert_eq!(run_chunks(&refs), expected);
}

#[test]
fn multibyte_text_survives_chunking() {
    let text = "héllo <think>ünïcode</think>wörld ✓";
    let chars: Vec<String> = text.chars().map(String::from).collect();
    let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
    assert_eq!(run_chunks(&refs), "héllo wörld ✓");
}

#[test]
fn many_spans_in_one_chunk() {
    let text = "<think>x</think>a".repeat(1_000);
    assert_eq!(strip_think_tags(&text), "a".repeat(1_000));
}

#[tokio::test]
async fn stream_adapter_filters_in_order() {
    let chunks: Vec<Result<String>> = ["Use ", "<thi", "nk>hmm</th", "ink>git ", "rebase"]
        .into_iter()
        .map(|s| Ok(s.to_string()))
        .collect();

    let out: Vec<String> = ThinkFilterStream::new(stream::iter(chunks))
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert!(out.iter().all(|c| !c.is_empty()));
    assert_eq!(out.concat(), "Use git rebase");
}

#[tokio::test]
async fn stream_adapter_yields_flush_remainder_last() {
    let chunks: Vec<Result<String>> = vec![Ok("done <th".into())];
    let out: Vec<String> = ThinkFilterStream::new(stream::iter(chunks))
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(out, vec!["done ".to_string(), "<th".to_string()]);
}

#[tokio::test]
async fn stream_adapter_passes_errors_through() {
    let chunks: Vec<Result<String>> = vec![
        Ok("a".into()),
        Err(HuginnError::Stream("boom".into())),
        Ok("b".into()),
    ];
    let out: Vec<Result<String>> = ThinkFilterStream::new(stream::iter(chunks)).collect().await;
    assert_eq!(out.len(), 3);
    assert!(matches!(out[1], Err(HuginnError::Stream(_))));
}
