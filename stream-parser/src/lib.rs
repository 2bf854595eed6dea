//! Chunk-safe segmentation of generated text into narrative text and tagged blocks.
//!
//! - [`SingleTagMatcher`] classifies a stream into matched/unmatched runs for one tag.
//! - [`BlockParser`] splits a complete message into [`Segment`]s.
//! - [`StreamSegmenter`] does the same incrementally, never exposing a partial marker.
//! - [`TagContentExtractor`] streams the contents of tags such as `<think>` apart
//!   from the surrounding text.
//! - [`Utf8StreamParser`] feeds any of these from raw byte chunks.

mod block_parser;
mod config;
mod error;
mod markers;
mod segmenter;
mod stream_text;
mod tag_extractor;
mod tag_matcher;
mod utf8_stream;

pub use block_parser::BlockParser;
pub use block_parser::Segment;
pub use block_parser::SpanParse;
pub use block_parser::TaggedBlock;
pub use block_parser::parse_blocks;
pub use config::SegmenterConfig;
pub use error::Error;
pub use error::Result;
pub use markers::DEFAULT_RAW_FIELD;
pub use markers::TagKind;
pub use markers::TagMarkers;
pub use markers::TagVocabulary;
pub use segmenter::StreamSegmenter;
pub use stream_text::StreamTextParser;
pub use tag_extractor::ExtractedText;
pub use tag_extractor::TagContentExtractor;
pub use tag_extractor::split_tag_content;
pub use tag_matcher::RunResult;
pub use tag_matcher::SingleTagMatcher;
pub use utf8_stream::Utf8StreamError;
pub use utf8_stream::Utf8StreamParser;
