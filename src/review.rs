//! Interactive keep-or-discard review.
//!
//! After a rendered video has been played back, the user is asked whether
//! to keep it. The answer drives a tiny state machine:
//!
//! ```text
//! AwaitingInput --(""|y|Y)--> Committed
//! AwaitingInput --(n|N)-----> Discarded
//! AwaitingInput --(other)---> AwaitingInput   (error message, re-prompt)
//! ```
//!
//! The loop waits on input indefinitely; there is no timeout.

use std::io::{BufRead, Write};

use crate::error::WavelabError;

/// Prompt shown before every read.
pub const PROMPT: &str = "Keep this result? [Y/n] ";

/// Message emitted for anything other than y, n or an empty line.
pub const INVALID_INPUT_MESSAGE: &str = "you have to input either y or n";

/// A terminal outcome of the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the artifacts on disk.
    Commit,
    /// Delete the artifacts.
    Discard,
}

/// State of the review loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Waiting for a line of input.
    AwaitingInput,
    /// The user accepted the result.
    Committed,
    /// The user rejected the result.
    Discarded,
}

impl ReviewState {
    /// Apply one line of input.
    ///
    /// Terminal states ignore further input.
    pub fn on_input(self, line: &str) -> ReviewState {
        match self {
            ReviewState::AwaitingInput => match line.trim() {
                "" | "y" | "Y" => ReviewState::Committed,
                "n" | "N" => ReviewState::Discarded,
                _ => ReviewState::AwaitingInput,
            },
            terminal => terminal,
        }
    }

    /// The decision this state stands for, if it is terminal.
    pub fn decision(self) -> Option<Decision> {
        match self {
            ReviewState::AwaitingInput => None,
            ReviewState::Committed => Some(Decision::Commit),
            ReviewState::Discarded => Some(Decision::Discard),
        }
    }
}

/// Drives the review loop over arbitrary input and output streams.
///
/// Prompts go to `prompt`, complaints about invalid answers go to
/// `errors`. The binary wires these to stdin, stdout and stderr; tests use
/// in-memory buffers.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
///
/// use wavelab::review::{Decision, Reviewer};
///
/// let mut prompt = Vec::new();
/// let mut errors = Vec::new();
/// let mut reviewer = Reviewer::new(Cursor::new("maybe\nn\n"), &mut prompt, &mut errors);
/// assert_eq!(reviewer.review().unwrap(), Decision::Discard);
/// assert_eq!(reviewer.rejected_answers(), 1);
/// ```
pub struct Reviewer<R, W, E> {
    input: R,
    prompt: W,
    errors: E,
    rejected_answers: usize,
}

impl<R: BufRead, W: Write, E: Write> Reviewer<R, W, E> {
    /// Create a reviewer reading answers from `input`.
    pub fn new(input: R, prompt: W, errors: E) -> Self {
        Self {
            input,
            prompt,
            errors,
            rejected_answers: 0,
        }
    }

    /// How many invalid answers have been rejected so far.
    pub fn rejected_answers(&self) -> usize {
        self.rejected_answers
    }

    /// Prompt until a valid answer arrives and return the decision.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InputClosed`] if the input ends before a
    /// valid answer, and [`WavelabError::IoError`] if reading or writing
    /// fails.
    pub fn review(&mut self) -> Result<Decision, WavelabError> {
        let mut state = ReviewState::AwaitingInput;
        let mut line = String::new();

        loop {
            write!(self.prompt, "{PROMPT}")?;
            self.prompt.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(WavelabError::InputClosed);
            }

            state = state.on_input(&line);
            if let Some(decision) = state.decision() {
                log::debug!("Review finished with {decision:?}");
                return Ok(decision);
            }

            self.rejected_answers += 1;
            writeln!(self.errors, "{INVALID_INPUT_MESSAGE}")?;
        }
    }
}
