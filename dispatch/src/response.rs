use tagstream_stream_parser::Segment;
use tagstream_stream_parser::StreamSegmenter;
use tagstream_stream_parser::TaggedBlock;
use thiserror::Error;
use tracing::debug;

use crate::BlockOutcome;
use crate::ExecutorRegistry;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parser(#[from] tagstream_stream_parser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    Text(String),
    Block {
        block: TaggedBlock,
        outcome: BlockOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResult {
    pub name: String,
    pub outcome: BlockOutcome,
}

/// Everything left over once a response has been fully consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    /// Events produced by flushing the segmenter.
    pub trailing: Vec<ResponseEvent>,
    /// The response exactly as it was streamed.
    pub response: String,
    /// Outcomes of every recognized block, in response order.
    pub results: Vec<BlockResult>,
}

impl ResponseSummary {
    /// Message reporting block outcomes back to the model, or `None` when the
    /// response contained no blocks.
    pub fn next_turn_message(&self) -> Option<String> {
        if self.results.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.results.iter().map(format_block_result).collect();
        Some(parts.join("\n\n"))
    }
}

pub fn format_block_result(result: &BlockResult) -> String {
    let name = &result.name;
    match &result.outcome {
        BlockOutcome::Completed(output) => format!("[{name}] Result:\n{output}"),
        BlockOutcome::Failed(message) => format!("[{name}] Error:\n{message}"),
        BlockOutcome::Unsupported => format!("[{name}] Error:\nunsupported block: {name}"),
        BlockOutcome::Skipped => {
            format!("[{name}] Error:\nblock was not closed before the response ended; not run")
        }
    }
}

/// Drives one generated response: segments the stream and runs each block as
/// soon as its close marker arrives.
#[derive(Debug)]
pub struct ResponseProcessor<'a> {
    segmenter: StreamSegmenter,
    registry: &'a ExecutorRegistry,
    response: String,
    results: Vec<BlockResult>,
}

impl<'a> ResponseProcessor<'a> {
    pub fn new(segmenter: StreamSegmenter, registry: &'a ExecutorRegistry) -> Self {
        Self {
            segmenter,
            registry,
            response: String::new(),
            results: Vec::new(),
        }
    }

    pub fn push_str(&mut self, chunk: &str) -> Result<Vec<ResponseEvent>, DispatchError> {
        let segments = self.segmenter.feed(chunk)?;
        self.response.push_str(chunk);
        Ok(self.handle_segments(segments))
    }

    /// Flush the stream. Fails if called twice.
    pub fn finish(&mut self) -> Result<ResponseSummary, DispatchError> {
        let segments = self.segmenter.finish()?;
        let trailing = self.handle_segments(segments);
        debug!(
            blocks = self.results.len(),
            response_len = self.response.len(),
            "response finished"
        );
        Ok(ResponseSummary {
            trailing,
            response: std::mem::take(&mut self.response),
            results: std::mem::take(&mut self.results),
        })
    }

    fn handle_segments(&mut self, segments: Vec<Segment>) -> Vec<ResponseEvent> {
        segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => ResponseEvent::Text(text),
                Segment::Block(block) => {
                    let outcome = self.registry.dispatch(&block);
                    self.results.push(BlockResult {
                        name: block.name.clone(),
                        outcome: outcome.clone(),
                    });
                    ResponseEvent::Block { block, outcome }
                }
            })
            .collect()
    }
}
