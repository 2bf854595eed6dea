use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::BlockParser;
use crate::DEFAULT_RAW_FIELD;
use crate::Error;
use crate::Result;
use crate::StreamSegmenter;
use crate::TagVocabulary;

/// Segmenter settings as read from TOML.
///
/// ```toml
/// block_names = ["read_file", "write_to_file"]
/// field_names = ["path", "content"]
/// raw_field = "content"           # must be one of field_names when set
/// max_block_bytes = 1048576
/// escape_truncated_markers = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmenterConfig {
    pub block_names: Vec<String>,
    #[serde(default)]
    pub field_names: Vec<String>,
    /// Field kept verbatim; `content` when unset.
    #[serde(default)]
    pub raw_field: Option<String>,
    /// Open blocks longer than this are given up on and shown as text.
    #[serde(default)]
    pub max_block_bytes: Option<usize>,
    #[serde(default = "default_escape_truncated_markers")]
    pub escape_truncated_markers: bool,
}

fn default_escape_truncated_markers() -> bool {
    true
}

impl SegmenterConfig {
    pub fn new<B, F>(block_names: B, field_names: F) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            block_names: block_names.into_iter().map(Into::into).collect(),
            field_names: field_names.into_iter().map(Into::into).collect(),
            raw_field: None,
            max_block_bytes: None,
            escape_truncated_markers: default_escape_truncated_markers(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|source| Error::ConfigParse { path: None, source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        debug!(
            path = %path.display(),
            blocks = config.block_names.len(),
            fields = config.field_names.len(),
            "loaded segmenter config"
        );
        Ok(config)
    }

    /// Validate the name lists and the raw field.
    pub fn vocabulary(&self) -> Result<TagVocabulary> {
        let vocabulary =
            TagVocabulary::new(self.block_names.iter().cloned(), self.field_names.iter().cloned())?;
        let Some(raw_field) = &self.raw_field else {
            return Ok(vocabulary.with_raw_field(DEFAULT_RAW_FIELD));
        };
        if !self.field_names.contains(raw_field) {
            return Err(Error::UnknownRawField {
                name: raw_field.clone(),
            });
        }
        Ok(vocabulary.with_raw_field(raw_field.clone()))
    }

    pub fn build_segmenter(&self) -> Result<StreamSegmenter> {
        Ok(StreamSegmenter::new(self.vocabulary()?)
            .with_max_block_bytes(self.max_block_bytes)
            .with_escape_truncated_markers(self.escape_truncated_markers))
    }

    pub fn build_block_parser(&self) -> Result<BlockParser> {
        Ok(BlockParser::new(self.vocabulary()?))
    }
}
