//! Batch splitting of a complete message into text segments and tagged blocks.

use indexmap::IndexMap;

use crate::Result;
use crate::TagVocabulary;

/// A recognized tagged block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedBlock {
    pub name: String,
    /// Field values in the order they were first finalized.
    pub fields: IndexMap<String, String>,
    /// False when the input ended before the block's close marker.
    pub complete: bool,
    /// Everything consumed for this block, open marker included.
    pub raw_span: String,
}

/// Unit of output shared by the batch parser and the stream segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Block(TaggedBlock),
}

/// Outcome of a structural parse of one block's raw span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanParse {
    /// The span is exactly one closed block.
    Complete(TaggedBlock),
    /// The span is one block whose close marker never arrived. A field cut off
    /// by the end of the span keeps its partial value.
    Unterminated(TaggedBlock),
    /// Anything else: trailing text, several blocks, no block at all.
    Malformed,
}

#[derive(Debug)]
struct ActiveBlock {
    block: usize,
    start: usize,
    body_start: usize,
    depth: usize,
    fields: IndexMap<String, String>,
    field: Option<ActiveField>,
}

#[derive(Debug)]
struct ActiveField {
    field: usize,
    value_start: usize,
}

/// Single forward pass parser for whole messages.
///
/// At every character the parser checks whether the consumed prefix ends with a
/// marker, in priority order:
/// 1. inside a field: that field's close marker;
/// 2. inside a block: the block's own close marker (same-name nesting aware),
///    then its own open marker, then any whitelisted field open marker;
/// 3. outside a block: any whitelisted block open marker (listing order wins).
///
/// Text segments are trimmed and empty ones dropped. A block still open at the
/// end of the input is emitted with `complete == false`.
#[derive(Debug, Clone)]
pub struct BlockParser {
    vocabulary: TagVocabulary,
}

impl BlockParser {
    pub fn new(vocabulary: TagVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }

    pub fn parse(&self, message: &str) -> Vec<Segment> {
        self.scan(message)
    }

    /// Structural parse of a span that starts with a block open marker.
    pub fn parse_span(&self, span: &str) -> SpanParse {
        let mut segments = self.scan(span).into_iter();
        match (segments.next(), segments.next()) {
            (Some(Segment::Block(block)), None) if block.raw_span.len() == span.len() => {
                if block.complete {
                    SpanParse::Complete(block)
                } else {
                    SpanParse::Unterminated(block)
                }
            }
            _ => SpanParse::Malformed,
        }
    }

    fn scan(&self, message: &str) -> Vec<Segment> {
        let blocks = self.vocabulary.blocks();
        let fields = self.vocabulary.fields();
        let mut segments = Vec::new();
        let mut text_start = 0;
        let mut active: Option<ActiveBlock> = None;

        for (idx, ch) in message.char_indices() {
            let end = idx + ch.len_utf8();
            let consumed = &message[..end];

            let Some(current) = active.as_mut() else {
                if let Some(block) = blocks
                    .iter()
                    .position(|markers| consumed.ends_with(&markers.open))
                {
                    let start = end - blocks[block].open.len();
                    push_trimmed_text(&mut segments, &message[text_start..start]);
                    active = Some(ActiveBlock {
                        block,
                        start,
                        body_start: end,
                        depth: 1,
                        fields: IndexMap::new(),
                        field: None,
                    });
                }
                continue;
            };

            if let Some(field) = &current.field {
                let markers = &fields[field.field];
                if !consumed.ends_with(&markers.close) {
                    continue;
                }
                let value = &message[field.value_start..end - markers.close.len()];
                let value = self.finalize_field(&markers.name, value);
                current.fields.insert(markers.name.clone(), value);
                current.field = None;
            }

            let markers = &blocks[current.block];
            if consumed.ends_with(&markers.close) {
                current.depth -= 1;
                if current.depth == 0 {
                    let body = &message[current.body_start..end - markers.close.len()];
                    self.recover_raw_field(body, &mut current.fields);
                    segments.push(Segment::Block(TaggedBlock {
                        name: markers.name.clone(),
                        fields: std::mem::take(&mut current.fields),
                        complete: true,
                        raw_span: message[current.start..end].to_string(),
                    }));
                    active = None;
                    text_start = end;
                }
                continue;
            }
            if consumed.ends_with(&markers.open) {
                current.depth += 1;
                continue;
            }
            if let Some(field) = fields
                .iter()
                .position(|markers| consumed.ends_with(&markers.open))
            {
                current.field = Some(ActiveField {
                    field,
                    value_start: end,
                });
            }
        }

        match active {
            Some(mut current) => {
                if let Some(field) = current.field.take() {
                    let name = &fields[field.field].name;
                    let value = self.finalize_field(name, &message[field.value_start..]);
                    current.fields.insert(name.clone(), value);
                }
                segments.push(Segment::Block(TaggedBlock {
                    name: blocks[current.block].name.clone(),
                    fields: current.fields,
                    complete: false,
                    raw_span: message[current.start..].to_string(),
                }));
            }
            None => push_trimmed_text(&mut segments, &message[text_start..]),
        }

        segments
    }

    fn finalize_field(&self, name: &str, value: &str) -> String {
        if self.vocabulary.is_raw_field(name) {
            strip_single_newlines(value).to_string()
        } else {
            value.trim().to_string()
        }
    }

    /// Re-read the raw field from the block body using the last close marker, so
    /// marker-like text inside the value does not truncate it.
    fn recover_raw_field(&self, body: &str, fields: &mut IndexMap<String, String>) {
        let Some(markers) = self.vocabulary.raw_field_markers() else {
            return;
        };
        let Some(open) = body.find(&markers.open) else {
            return;
        };
        let value_start = open + markers.open.len();
        match body.rfind(&markers.close) {
            Some(close) if close >= value_start => {
                let value = strip_single_newlines(&body[value_start..close]);
                fields.insert(markers.name.clone(), value.to_string());
            }
            _ => {}
        }
    }
}

/// Parse `message` with freshly validated whitelists.
pub fn parse_blocks<B, F>(message: &str, block_names: B, field_names: F) -> Result<Vec<Segment>>
where
    B: IntoIterator,
    B::Item: Into<String>,
    F: IntoIterator,
    F::Item: Into<String>,
{
    let vocabulary = TagVocabulary::new(block_names, field_names)?;
    Ok(BlockParser::new(vocabulary).parse(message))
}

fn strip_single_newlines(value: &str) -> &str {
    let value = value.strip_prefix('\n').unwrap_or(value);
    value.strip_suffix('\n').unwrap_or(value)
}

fn push_trimmed_text(segments: &mut Vec<Segment>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}
