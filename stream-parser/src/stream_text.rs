use crate::Result;

/// Trait for parsers that consume streamed text and emit ordered items.
///
/// Implementations must never emit an item that later input could change.
pub trait StreamTextParser {
    /// Item produced by this parser (a classified run, a segment, ...).
    type Item;

    /// Feed a new text chunk.
    fn push_str(&mut self, chunk: &str) -> Result<Vec<Self::Item>>;

    /// Flush any buffered state at end-of-stream.
    fn finish(&mut self) -> Result<Vec<Self::Item>>;
}
