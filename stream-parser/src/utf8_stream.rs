use thiserror::Error;

use crate::StreamTextParser;

/// Error returned by [`Utf8StreamParser`].
#[derive(Debug, Error)]
pub enum Utf8StreamError {
    /// The buffered bytes contain an invalid UTF-8 sequence.
    #[error("invalid UTF-8 in streamed bytes at offset {valid_up_to} (error length {error_len})")]
    InvalidUtf8 {
        /// Byte offset in the buffered bytes where decoding failed.
        valid_up_to: usize,
        /// Length in bytes of the invalid sequence.
        error_len: usize,
    },
    /// EOF was reached with a buffered partial code point.
    #[error("incomplete UTF-8 code point at end of stream")]
    IncompleteUtf8AtEof,
    #[error(transparent)]
    Parser(#[from] crate::Error),
}

/// Wraps a [`StreamTextParser`] and accepts raw bytes, buffering partial UTF-8 code points.
///
/// Transports usually hand over `&[u8]`, and a code point may be split across
/// chunk boundaries (for example `0xC3` followed by `0xA9` for `é`).
#[derive(Debug)]
pub struct Utf8StreamParser<P> {
    inner: P,
    pending_utf8: Vec<u8>,
}

impl<P> Utf8StreamParser<P>
where
    P: StreamTextParser,
{
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            pending_utf8: Vec::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Feed a raw byte chunk.
    ///
    /// On invalid UTF-8 the whole chunk is rolled back, so the wrapped parser
    /// never sees a prefix of a rejected chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Result<Vec<P::Item>, Utf8StreamError> {
        let old_len = self.pending_utf8.len();
        self.pending_utf8.extend_from_slice(chunk);

        let valid_up_to = match std::str::from_utf8(&self.pending_utf8) {
            Ok(_) => self.pending_utf8.len(),
            Err(err) => {
                if let Some(error_len) = err.error_len() {
                    self.pending_utf8.truncate(old_len);
                    return Err(Utf8StreamError::InvalidUtf8 {
                        valid_up_to: err.valid_up_to(),
                        error_len,
                    });
                }
                err.valid_up_to()
            }
        };
        if valid_up_to == 0 {
            return Ok(Vec::new());
        }

        let text = match std::str::from_utf8(&self.pending_utf8[..valid_up_to]) {
            Ok(text) => text,
            Err(err) => {
                self.pending_utf8.truncate(old_len);
                return Err(Utf8StreamError::InvalidUtf8 {
                    valid_up_to: err.valid_up_to(),
                    error_len: err.error_len().unwrap_or(0),
                });
            }
        };
        let out = self.inner.push_str(text)?;
        self.pending_utf8.drain(..valid_up_to);
        Ok(out)
    }

    pub fn finish(&mut self) -> Result<Vec<P::Item>, Utf8StreamError> {
        self.check_pending()?;
        let mut out = if self.pending_utf8.is_empty() {
            Vec::new()
        } else {
            let pending = std::mem::take(&mut self.pending_utf8);
            let text = String::from_utf8_lossy(&pending);
            self.inner.push_str(&text)?
        };
        out.extend(self.inner.finish()?);
        Ok(out)
    }

    /// Return the wrapped parser if no undecoded bytes are buffered.
    ///
    /// Call [`Self::finish`] first to flush buffered text into the wrapped parser.
    pub fn into_inner(self) -> Result<P, Utf8StreamError> {
        self.check_pending()?;
        Ok(self.inner)
    }

    /// Return the wrapped parser, dropping any buffered partial code point.
    pub fn into_inner_lossy(self) -> P {
        self.inner
    }

    fn check_pending(&self) -> Result<(), Utf8StreamError> {
        match std::str::from_utf8(&self.pending_utf8) {
            Ok(_) => Ok(()),
            Err(err) => match err.error_len() {
                Some(error_len) => Err(Utf8StreamError::InvalidUtf8 {
                    valid_up_to: err.valid_up_to(),
                    error_len,
                }),
                None => Err(Utf8StreamError::IncompleteUtf8AtEof),
            },
        }
    }
}
