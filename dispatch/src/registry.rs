use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tagstream_stream_parser::TaggedBlock;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("block `{block}` is missing required field `{field}`")]
    MissingField { block: String, field: String },
    #[error("{0}")]
    Failed(String),
}

/// Name and field values of a completed block, as handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInvocation {
    pub name: String,
    pub fields: IndexMap<String, String>,
}

impl BlockInvocation {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_field(&self, name: &str) -> Result<&str, ExecutorError> {
        self.field(name).ok_or_else(|| ExecutorError::MissingField {
            block: self.name.clone(),
            field: name.to_string(),
        })
    }
}

impl From<&TaggedBlock> for BlockInvocation {
    fn from(block: &TaggedBlock) -> Self {
        Self {
            name: block.name.clone(),
            fields: block.fields.clone(),
        }
    }
}

pub trait BlockExecutor: Send + Sync {
    /// Run the block and return the text reported back to the model.
    fn execute(&self, invocation: &BlockInvocation) -> Result<String, ExecutorError>;
}

impl<F> BlockExecutor for F
where
    F: Fn(&BlockInvocation) -> Result<String, ExecutorError> + Send + Sync,
{
    fn execute(&self, invocation: &BlockInvocation) -> Result<String, ExecutorError> {
        self(invocation)
    }
}

/// What happened to one block handed to [`ExecutorRegistry::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Completed(String),
    Failed(String),
    /// No executor is registered under the block name.
    Unsupported,
    /// The block was cut off by the end of the response and was not run.
    Skipped,
}

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn BlockExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn BlockExecutor>) {
        let name = name.into();
        if self.executors.insert(name.clone(), executor).is_some() {
            warn!("overwriting executor for block {name}");
        }
    }

    pub fn executor(&self, name: &str) -> Option<Arc<dyn BlockExecutor>> {
        self.executors.get(name).map(Arc::clone)
    }

    /// Registered block names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn dispatch(&self, block: &TaggedBlock) -> BlockOutcome {
        if !block.complete {
            debug!(block = %block.name, "skipping block cut off by end of response");
            return BlockOutcome::Skipped;
        }
        let Some(executor) = self.executor(&block.name) else {
            warn!(block = %block.name, "no executor registered for block");
            return BlockOutcome::Unsupported;
        };

        let invocation = BlockInvocation::from(block);
        match executor.execute(&invocation) {
            Ok(output) => {
                debug!(block = %block.name, output_len = output.len(), "block executed");
                BlockOutcome::Completed(output)
            }
            Err(err) => {
                debug!(block = %block.name, error = %err, "block execution failed");
                BlockOutcome::Failed(err.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}
