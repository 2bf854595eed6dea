use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::TagKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Malformed input never produces an error; it degrades to plain text. Only
/// misconfiguration and API misuse end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("at least one block name is required")]
    NoBlockNames,
    #[error("{kind} name must not be empty")]
    EmptyTagName { kind: TagKind },
    #[error("{kind} name `{name}` contains a character that cannot appear in a marker")]
    InvalidTagName { kind: TagKind, name: String },
    #[error("{kind} name `{name}` is listed more than once")]
    DuplicateTagName { kind: TagKind, name: String },
    #[error("{kind} name `{prefix}` is a prefix of `{name}`")]
    AmbiguousTagNames {
        kind: TagKind,
        prefix: String,
        name: String,
    },
    #[error("`{name}` is listed both as a block name and as a field name")]
    BlockFieldOverlap { name: String },
    #[error("raw field `{name}` is not one of the configured field names")]
    UnknownRawField { name: String },
    #[error("finish() was already called on this parser")]
    AlreadyFinished,
    #[error("cannot feed a parser after finish()")]
    FeedAfterFinish,
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config{}: {source}", display_path(.path.as_ref()))]
    ConfigParse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
}

fn display_path(path: Option<&PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}
