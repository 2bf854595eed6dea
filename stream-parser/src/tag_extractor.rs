use crate::Result;
use crate::StreamTextParser;
use crate::TagVocabulary;
use crate::markers::longest_suffix_prefix_len;

/// One classified piece of a stream handled by [`TagContentExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    Outside(String),
    Inside { tag: String, text: String },
}

/// Streaming splitter that separates the contents of configured tags from the
/// surrounding text, e.g. a model's `<thinking>` section.
///
/// Example with tag `think`:
/// - input: `hello <think>hmm</think> world`
/// - output: `Outside("hello ")`, `Inside("hmm")`, `Outside(" world")`
///
/// Unlike [`crate::StreamSegmenter`], tag contents stream out as they arrive;
/// only a trailing fragment that could be the start of a marker is held back.
/// Matching is literal and non-nested. If the stream ends while a tag is open,
/// [`TagContentExtractor::finish`] closes it implicitly. The extractor can be
/// reused after `finish` or [`TagContentExtractor::reset`].
#[derive(Debug)]
pub struct TagContentExtractor {
    tags: TagVocabulary,
    pending: String,
    active: Option<usize>,
}

impl TagContentExtractor {
    pub fn new<I>(tags: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Ok(Self {
            tags: TagVocabulary::new(tags, Vec::<String>::new())?,
            pending: String::new(),
            active: None,
        })
    }

    /// Drop buffered text and any open tag.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.active = None;
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<ExtractedText> {
        let mut out = Vec::new();
        self.pending.push_str(chunk);

        loop {
            if let Some(active) = self.active {
                let markers = &self.tags.blocks()[active];
                if let Some(close) = self.pending.find(&markers.close) {
                    push_inside(&mut out, &markers.name, &self.pending[..close]);
                    self.pending.drain(..close + markers.close.len());
                    self.active = None;
                    continue;
                }
                let keep = longest_suffix_prefix_len(&self.pending, &markers.close);
                let take = self.pending.len() - keep;
                push_inside(&mut out, &markers.name, &self.pending[..take]);
                self.pending.drain(..take);
                break;
            }

            if let Some((open, tag)) = self.tags.find_earliest_open(&self.pending) {
                push_outside(&mut out, &self.pending[..open]);
                let open_len = self.tags.blocks()[tag].open.len();
                self.pending.drain(..open + open_len);
                self.active = Some(tag);
                continue;
            }

            let keep = self.tags.longest_open_prefix_suffix(&self.pending);
            let take = self.pending.len() - keep;
            push_outside(&mut out, &self.pending[..take]);
            self.pending.drain(..take);
            break;
        }

        out
    }

    pub fn finish(&mut self) -> Vec<ExtractedText> {
        let mut out = Vec::new();
        let rest = std::mem::take(&mut self.pending);
        match self.active.take() {
            Some(active) => push_inside(&mut out, &self.tags.blocks()[active].name, &rest),
            None => push_outside(&mut out, &rest),
        }
        out
    }
}

impl StreamTextParser for TagContentExtractor {
    type Item = ExtractedText;

    fn push_str(&mut self, chunk: &str) -> Result<Vec<Self::Item>> {
        Ok(self.feed(chunk))
    }

    fn finish(&mut self) -> Result<Vec<Self::Item>> {
        Ok(TagContentExtractor::finish(self))
    }
}

/// Split a complete string into `(outside, inside)` text for one tag.
pub fn split_tag_content(text: &str, tag: &str) -> Result<(String, String)> {
    let mut extractor = TagContentExtractor::new([tag])?;
    let mut items = extractor.feed(text);
    items.extend(extractor.finish());

    let mut outside = String::new();
    let mut inside = String::new();
    for item in items {
        match item {
            ExtractedText::Outside(text) => outside.push_str(&text),
            ExtractedText::Inside { text, .. } => inside.push_str(&text),
        }
    }
    Ok((outside, inside))
}

fn push_outside(out: &mut Vec<ExtractedText>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(ExtractedText::Outside(existing)) = out.last_mut() {
        existing.push_str(text);
        return;
    }
    out.push(ExtractedText::Outside(text.to_string()));
}

fn push_inside(out: &mut Vec<ExtractedText>, tag: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(ExtractedText::Inside {
        tag: existing_tag,
        text: existing,
    }) = out.last_mut()
        && existing_tag == tag
    {
        existing.push_str(text);
        return;
    }
    out.push(ExtractedText::Inside {
        tag: tag.to_string(),
        text: text.to_string(),
    });
}
