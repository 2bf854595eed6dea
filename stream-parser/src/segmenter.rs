use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::BlockParser;
use crate::Error;
use crate::Result;
use crate::Segment;
use crate::SpanParse;
use crate::StreamTextParser;
use crate::TagMarkers;
use crate::TagVocabulary;
use crate::markers::floor_char_boundary;

/// Block whose open marker sits at the start of the carry-over buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenSpan {
    block: usize,
    depth: usize,
    /// Byte offset in the buffer from which the next scan for markers starts.
    scan_from: usize,
}

/// Incremental splitter of a generated response into text and tagged blocks.
///
/// Each [`StreamSegmenter::feed`] call drains as much of the carry-over buffer as
/// can be classified without further input:
/// - text before the earliest whitelisted block open marker is emitted at once;
/// - a trailing fragment that could still grow into an open marker is withheld;
/// - a block is emitted only when the close marker that brings same-name depth
///   back to zero has arrived.
///
/// Concatenating every `Text` payload with every block `raw_span`, in order,
/// yields the input unchanged, whatever the fragmentation. The only exception is
/// the escaping applied by [`StreamSegmenter::finish`] to a malformed block left
/// open at end of stream, which can be disabled.
///
/// Completed spans are handed to [`BlockParser::parse_span`]. Spans that do not
/// parse as one block are shown as plain text instead of failing.
#[derive(Debug)]
pub struct StreamSegmenter {
    parser: BlockParser,
    buffer: String,
    open: Option<OpenSpan>,
    max_block_bytes: Option<usize>,
    escape_truncated_markers: bool,
    finished: bool,
}

impl StreamSegmenter {
    pub fn new(vocabulary: TagVocabulary) -> Self {
        Self {
            parser: BlockParser::new(vocabulary),
            buffer: String::new(),
            open: None,
            max_block_bytes: None,
            escape_truncated_markers: true,
            finished: false,
        }
    }

    /// Build a segmenter from whitelists, validating them first.
    pub fn with_names<B, F>(block_names: B, field_names: F) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Ok(Self::new(TagVocabulary::new(block_names, field_names)?))
    }

    /// Abort an open block once its buffered span grows past `max` bytes.
    pub fn with_max_block_bytes(mut self, max: Option<usize>) -> Self {
        self.max_block_bytes = max;
        self
    }

    pub fn with_escape_truncated_markers(mut self, escape: bool) -> Self {
        self.escape_truncated_markers = escape;
        self
    }

    pub fn vocabulary(&self) -> &TagVocabulary {
        self.parser.vocabulary()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes currently withheld from output.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn feed(&mut self, fragment: &str) -> Result<Vec<Segment>> {
        if self.finished {
            return Err(Error::FeedAfterFinish);
        }
        let mut out = Vec::new();
        self.buffer.push_str(fragment);
        self.drain(&mut out);
        Ok(out)
    }

    /// Flush the carry-over buffer. May only be called once.
    pub fn finish(&mut self) -> Result<Vec<Segment>> {
        if self.finished {
            return Err(Error::AlreadyFinished);
        }
        self.finished = true;

        let mut out = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        let Some(open) = self.open.take() else {
            push_text(&mut out, &rest);
            return Ok(out);
        };

        let name = &self.vocabulary().blocks()[open.block].name;
        match self.parser.parse_span(&rest) {
            SpanParse::Complete(block) => out.push(Segment::Block(block)),
            SpanParse::Unterminated(block) if !block.fields.is_empty() => {
                debug!(block = %name, "stream ended inside block; emitting partial fields");
                out.push(Segment::Block(block));
            }
            SpanParse::Unterminated(_) | SpanParse::Malformed => {
                debug!(block = %name, "stream ended inside unparseable block; emitting as text");
                if self.escape_truncated_markers {
                    let escaped = escape_truncated_markers(&rest, self.vocabulary().blocks());
                    push_text(&mut out, &escaped);
                } else {
                    push_text(&mut out, &rest);
                }
            }
        }
        Ok(out)
    }

    fn drain(&mut self, out: &mut Vec<Segment>) {
        loop {
            if let Some(mut open) = self.open {
                let markers = &self.parser.vocabulary().blocks()[open.block];
                let end = find_span_end(&self.buffer, markers, &mut open);
                let span_len = end.unwrap_or(self.buffer.len());
                if let Some(max) = self.max_block_bytes
                    && span_len > max
                {
                    self.abort_open_span(max, out);
                    continue;
                }
                match end {
                    Some(end) => {
                        let span: String = self.buffer.drain(..end).collect();
                        self.open = None;
                        self.emit_span(span, out);
                        continue;
                    }
                    None => {
                        self.open = Some(open);
                        return;
                    }
                }
            }

            match self.parser.vocabulary().find_earliest_open(&self.buffer) {
                Some((pos, block)) => {
                    let text: String = self.buffer.drain(..pos).collect();
                    push_text(out, &text);
                    let open_len = self.parser.vocabulary().blocks()[block].open.len();
                    self.open = Some(OpenSpan {
                        block,
                        depth: 1,
                        scan_from: open_len,
                    });
                }
                None => {
                    let keep = self.parser.vocabulary().longest_open_prefix_suffix(&self.buffer);
                    let take = self.buffer.len() - keep;
                    let text: String = self.buffer.drain(..take).collect();
                    push_text(out, &text);
                    if keep > 0 {
                        trace!(withheld = %self.buffer, "holding back possible open marker");
                    }
                    return;
                }
            }
        }
    }

    fn emit_span(&self, span: String, out: &mut Vec<Segment>) {
        match self.parser.parse_span(&span) {
            SpanParse::Complete(block) => {
                debug!(block = %block.name, fields = block.fields.len(), "block completed");
                out.push(Segment::Block(block));
            }
            SpanParse::Unterminated(_) | SpanParse::Malformed => {
                warn!(
                    span_len = span.len(),
                    "closed block did not parse as a single block; showing it as text"
                );
                push_text(out, &span);
            }
        }
    }

    /// Give up on the open block once its span outgrows `max`. The first `max`
    /// bytes of the span become text, cut before any partial open marker, and
    /// the rest is scanned again from outside any block.
    fn abort_open_span(&mut self, max: usize, out: &mut Vec<Segment>) {
        let Some(open) = self.open.take() else {
            return;
        };
        let markers = &self.vocabulary().blocks()[open.block];
        let mut cut = floor_char_boundary(&self.buffer, max.max(markers.open.len()));
        cut -= self
            .vocabulary()
            .longest_open_prefix_suffix(&self.buffer[..cut]);
        warn!(
            block = %markers.name,
            span_len = self.buffer.len(),
            max,
            "open block exceeded the maximum span length; showing it as text"
        );
        let text: String = self.buffer.drain(..cut).collect();
        push_text(out, &text);
    }
}

impl StreamTextParser for StreamSegmenter {
    type Item = Segment;

    fn push_str(&mut self, chunk: &str) -> Result<Vec<Self::Item>> {
        self.feed(chunk)
    }

    fn finish(&mut self) -> Result<Vec<Self::Item>> {
        StreamSegmenter::finish(self)
    }
}

/// Scan `buffer` (which starts with `markers.open`) for the close marker that
/// brings depth back to zero. Returns the byte offset just past it.
///
/// When the close is not there yet, `open` records where the next scan should
/// resume so already-counted markers are not counted twice.
fn find_span_end(buffer: &str, markers: &TagMarkers, open: &mut OpenSpan) -> Option<usize> {
    let mut cursor = open.scan_from;
    loop {
        let rest = &buffer[cursor..];
        let next_open = rest.find(&markers.open);
        let next_close = rest.find(&markers.close);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                open.depth += 1;
                cursor += o + markers.open.len();
            }
            (Some(o), None) => {
                open.depth += 1;
                cursor += o + markers.open.len();
            }
            (_, Some(c)) => {
                open.depth -= 1;
                cursor += c + markers.close.len();
                if open.depth == 0 {
                    return Some(cursor);
                }
            }
            (None, None) => {
                let longest = markers.open.len().max(markers.close.len());
                let tail = floor_char_boundary(buffer, buffer.len().saturating_sub(longest - 1));
                open.scan_from = cursor.max(tail);
                return None;
            }
        }
    }
}

fn push_text(out: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(existing)) = out.last_mut() {
        existing.push_str(text);
        return;
    }
    out.push(Segment::Text(text.to_string()));
}

/// Replace `<` with `&lt;` where it starts a truncated block open marker, so a
/// display layer never sees half a tag.
///
/// A truncated marker is `<` followed by a proper prefix of some block open
/// marker (at least one name character) that does not continue into the full
/// marker, or a lone `<` at the very end.
fn escape_truncated_markers(text: &str, blocks: &[TagMarkers]) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if ch == '<' && is_truncated_marker(&text[idx..], blocks) {
            out.push_str("&lt;");
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_truncated_marker(rest: &str, blocks: &[TagMarkers]) -> bool {
    if rest == "<" {
        return true;
    }
    blocks.iter().any(|markers| {
        let common = common_prefix_len(rest, &markers.open);
        common >= 2 && common < markers.open.len()
    })
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map_or(0, |((idx, ch), _)| idx + ch.len_utf8())
}
