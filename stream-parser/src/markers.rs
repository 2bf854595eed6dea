use std::fmt;

use crate::Error;
use crate::Result;

/// Field whose value is preserved verbatim unless configured otherwise.
pub const DEFAULT_RAW_FIELD: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Block,
    Field,
    /// Name tracked by a single-tag matcher.
    Tag,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Block => f.write_str("block"),
            TagKind::Field => f.write_str("field"),
            TagKind::Tag => f.write_str("tag"),
        }
    }
}

/// Precomputed `<name>` / `</name>` delimiters for one candidate tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMarkers {
    pub name: String,
    pub open: String,
    pub close: String,
}

impl TagMarkers {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            open: format!("<{name}>"),
            close: format!("</{name}>"),
            name,
        }
    }
}

/// Validated, ordered whitelists of block and field names.
///
/// Order matters: when two candidates could match at the same position the
/// first listed wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    blocks: Vec<TagMarkers>,
    fields: Vec<TagMarkers>,
    raw_field: String,
}

impl TagVocabulary {
    pub fn new<B, F>(block_names: B, field_names: F) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let block_names: Vec<String> = block_names.into_iter().map(Into::into).collect();
        let field_names: Vec<String> = field_names.into_iter().map(Into::into).collect();

        if block_names.is_empty() {
            return Err(Error::NoBlockNames);
        }
        validate_names(TagKind::Block, &block_names)?;
        validate_names(TagKind::Field, &field_names)?;
        if let Some(name) = block_names.iter().find(|name| field_names.contains(name)) {
            return Err(Error::BlockFieldOverlap { name: name.clone() });
        }

        Ok(Self {
            blocks: block_names.into_iter().map(TagMarkers::new).collect(),
            fields: field_names.into_iter().map(TagMarkers::new).collect(),
            raw_field: DEFAULT_RAW_FIELD.to_string(),
        })
    }

    /// Override the field whose value keeps its interior verbatim.
    pub fn with_raw_field(mut self, name: impl Into<String>) -> Self {
        self.raw_field = name.into();
        self
    }

    pub fn blocks(&self) -> &[TagMarkers] {
        &self.blocks
    }

    pub fn fields(&self) -> &[TagMarkers] {
        &self.fields
    }

    pub fn raw_field(&self) -> &str {
        &self.raw_field
    }

    pub fn is_raw_field(&self, name: &str) -> bool {
        self.raw_field == name
    }

    /// Markers of the raw field, if it is whitelisted.
    pub(crate) fn raw_field_markers(&self) -> Option<&TagMarkers> {
        self.fields
            .iter()
            .find(|markers| markers.name == self.raw_field)
    }

    /// Earliest full block open marker in `text` as `(byte offset, block index)`.
    pub(crate) fn find_earliest_open(&self, text: &str) -> Option<(usize, usize)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(idx, markers)| text.find(&markers.open).map(|pos| (pos, idx)))
            .min_by(|(pos_a, idx_a), (pos_b, idx_b)| {
                pos_a.cmp(pos_b).then_with(|| idx_a.cmp(idx_b))
            })
    }

    /// Length of the longest suffix of `text` that is a strict prefix of some block open marker.
    pub(crate) fn longest_open_prefix_suffix(&self, text: &str) -> usize {
        self.blocks
            .iter()
            .map(|markers| longest_suffix_prefix_len(text, &markers.open))
            .max()
            .unwrap_or(0)
    }
}

pub(crate) fn validate_names(kind: TagKind, names: &[String]) -> Result<()> {
    for (idx, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(Error::EmptyTagName { kind });
        }
        if name
            .chars()
            .any(|ch| matches!(ch, '<' | '>' | '/') || ch.is_whitespace())
        {
            return Err(Error::InvalidTagName {
                kind,
                name: name.clone(),
            });
        }
        for other in &names[idx + 1..] {
            if other == name {
                return Err(Error::DuplicateTagName {
                    kind,
                    name: name.clone(),
                });
            }
            if other.starts_with(name.as_str()) {
                return Err(Error::AmbiguousTagNames {
                    kind,
                    prefix: name.clone(),
                    name: other.clone(),
                });
            }
            if name.starts_with(other.as_str()) {
                return Err(Error::AmbiguousTagNames {
                    kind,
                    prefix: other.clone(),
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Length of the longest suffix of `s` that is a strict, non-empty prefix of `needle`.
pub(crate) fn longest_suffix_prefix_len(s: &str, needle: &str) -> usize {
    let max = s.len().min(needle.len().saturating_sub(1));
    for k in (1..=max).rev() {
        if needle.is_char_boundary(k) && s.ends_with(&needle[..k]) {
            return k;
        }
    }
    0
}

/// Largest char boundary of `s` that is `<= index`.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut index = index;
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
