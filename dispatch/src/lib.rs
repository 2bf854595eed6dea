//! Runs the tagged blocks found in a generated response.
//!
//! [`ResponseProcessor`] feeds a response through a
//! [`tagstream_stream_parser::StreamSegmenter`] and hands every completed block
//! to the [`ExecutorRegistry`]. The collected results can be folded into the
//! next turn with [`ResponseSummary::next_turn_message`].

mod registry;
mod response;

pub use registry::BlockExecutor;
pub use registry::BlockInvocation;
pub use registry::BlockOutcome;
pub use registry::ExecutorError;
pub use registry::ExecutorRegistry;
pub use response::BlockResult;
pub use response::DispatchError;
pub use response::ResponseEvent;
pub use response::ResponseProcessor;
pub use response::ResponseSummary;
pub use response::format_block_result;
