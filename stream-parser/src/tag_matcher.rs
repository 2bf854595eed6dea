//! Best-effort classifier for a single tag name.
//!
//! Every character of the stream ends up in either a matched (inside the tag)
//! or an unmatched run. Malformed or misplaced markers are folded into the
//! surrounding run; this is a classifier, not a validator.

use crate::Result;
use crate::StreamTextParser;
use crate::TagKind;
use crate::markers::validate_names;

/// One coalesced run of characters with the same classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub matched: bool,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchState {
    Text,
    OpenPartial,
    ClosePartial,
}

/// Tracks one tag name across a character stream, counting nested
/// occurrences of that same tag so only the outermost close ends the match.
///
/// Example with tag `t`:
/// - input: `<t>A<t>B</t>C</t>tail`
/// - runs: `matched("A<t>B</t>C")`, `unmatched("tail")`
///
/// An unmatched open marker is only recognized when its `<` sits at
/// `anchor_position` (0-based, in characters). Once inside, nested opens are
/// recognized anywhere. One space is tolerated right after `<` (or `</`) and
/// one right before `>`.
///
/// The matcher is reusable: [`SingleTagMatcher::finish`] resets it.
#[derive(Debug)]
pub struct SingleTagMatcher {
    tag: Vec<char>,
    anchor_position: usize,
    state: MatchState,
    name_index: usize,
    leading_space: bool,
    trailing_space: bool,
    depth: usize,
    matched: bool,
    position: usize,
    pending: String,
    runs: Vec<RunResult>,
}

impl SingleTagMatcher {
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        Self::with_anchor(tag, 0)
    }

    pub fn with_anchor(tag: impl Into<String>, anchor_position: usize) -> Result<Self> {
        let tag: String = tag.into();
        validate_names(TagKind::Tag, std::slice::from_ref(&tag))?;
        Ok(Self {
            tag: tag.chars().collect(),
            anchor_position,
            state: MatchState::Text,
            name_index: 0,
            leading_space: false,
            trailing_space: false,
            depth: 0,
            matched: false,
            position: 0,
            pending: String::new(),
            runs: Vec::new(),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Classify a fragment. Characters that could still belong to a marker are held back.
    pub fn feed(&mut self, fragment: &str) -> Vec<RunResult> {
        for ch in fragment.chars() {
            self.step(ch);
        }
        std::mem::take(&mut self.runs)
    }

    /// Flush held-back characters into the current run and reset for a new stream.
    pub fn finish(&mut self) -> Vec<RunResult> {
        self.collect();
        let runs = std::mem::take(&mut self.runs);
        self.state = MatchState::Text;
        self.name_index = 0;
        self.depth = 0;
        self.matched = false;
        self.position = 0;
        runs
    }

    fn step(&mut self, ch: char) {
        self.pending.push(ch);
        self.position += 1;

        match self.state {
            MatchState::Text => {
                if ch == '<' && (self.position <= self.anchor_position + 1 || self.matched) {
                    self.state = MatchState::OpenPartial;
                    self.name_index = 0;
                    self.leading_space = false;
                    self.trailing_space = false;
                } else {
                    self.collect();
                }
            }
            MatchState::OpenPartial | MatchState::ClosePartial => self.step_marker(ch),
        }
    }

    fn step_marker(&mut self, ch: char) {
        let closing = self.state == MatchState::ClosePartial;
        let name_len = self.tag.len();

        if ch == '>' && self.name_index == name_len {
            if closing {
                self.close_marker();
            } else {
                self.open_marker();
            }
            return;
        }
        if !closing && ch == '/' && self.name_index == 0 && !self.leading_space {
            self.state = MatchState::ClosePartial;
            return;
        }
        if ch == ' ' {
            if self.name_index == 0 && !self.leading_space {
                self.leading_space = true;
                return;
            }
            if self.name_index == name_len && !self.trailing_space {
                self.trailing_space = true;
                return;
            }
        }
        if self.name_index < name_len && self.tag[self.name_index] == ch {
            self.name_index += 1;
            return;
        }

        self.state = MatchState::Text;
        self.collect();
    }

    fn open_marker(&mut self) {
        self.state = MatchState::Text;
        if !self.matched {
            // The outermost marker is a boundary, not content.
            self.pending.clear();
        }
        self.depth += 1;
        self.matched = true;
    }

    fn close_marker(&mut self) {
        self.state = MatchState::Text;
        if self.depth == 0 {
            self.collect();
            return;
        }
        self.depth -= 1;
        self.matched = self.depth > 0;
        if !self.matched {
            self.pending.clear();
        }
    }

    fn collect(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.pending);
        if let Some(last) = self.runs.last_mut()
            && last.matched == self.matched
        {
            last.data.push_str(&data);
            return;
        }
        self.runs.push(RunResult {
            matched: self.matched,
            data,
        });
    }
}

impl StreamTextParser for SingleTagMatcher {
    type Item = RunResult;

    fn push_str(&mut self, chunk: &str) -> Result<Vec<Self::Item>> {
        Ok(self.feed(chunk))
    }

    fn finish(&mut self) -> Result<Vec<Self::Item>> {
        Ok(SingleTagMatcher::finish(self))
    }
}
