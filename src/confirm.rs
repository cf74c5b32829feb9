use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::error::ConfirmationError;
use crate::gateways::ConfirmationSurface;
use crate::models::ItemReference;

/// Asks on a terminal (or any reader/writer pair) whether to commit each note
pub struct PromptConfirmation {
    io: Mutex<PromptIo>,
}

struct PromptIo {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl PromptConfirmation {
    /// Prompt on stdout, read answers from stdin
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            io: Mutex::new(PromptIo {
                input: Box::new(input),
                output: Box::new(output),
            }),
        }
    }
}

impl ConfirmationSurface for PromptConfirmation {
    fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, ConfirmationError> {
        let mut prompt = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let io_error = |e: io::Error| ConfirmationError(e.to_string());

        writeln!(prompt.output, "\nPLEASE REVIEW the comment prepared for {reference}:\n")
            .map_err(io_error)?;
        writeln!(prompt.output, "{note}\n").map_err(io_error)?;
        write!(prompt.output, "Add this comment to {reference}? (y/n): ").map_err(io_error)?;
        prompt.output.flush().map_err(io_error)?;

        let mut answer = String::new();
        let read = prompt.input.read_line(&mut answer).map_err(io_error)?;
        if read == 0 {
            return Err(ConfirmationError("input closed before an answer".to_string()));
        }

        Ok(is_affirmative(&answer))
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Replays a fixed list of answers; declines once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<bool>>,
    seen: Mutex<Vec<(ItemReference, String)>>,
}

impl ScriptedConfirmation {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Notes presented so far, in presentation order
    pub fn presented(&self) -> Vec<(ItemReference, String)> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfirmationSurface for ScriptedConfirmation {
    fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, ConfirmationError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((reference.clone(), note.to_string()));

        let answer = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(false);
        Ok(answer)
    }
}

/// Gives the same answer to every prompt
#[derive(Debug)]
pub struct AlwaysConfirmation {
    answer: bool,
    seen: Mutex<Vec<(ItemReference, String)>>,
}

impl AlwaysConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn presented(&self) -> Vec<(ItemReference, String)> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfirmationSurface for AlwaysConfirmation {
    fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, ConfirmationError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((reference.clone(), note.to_string()));
        Ok(self.answer)
    }
}

/// Dry-run surface: logs each proposed note and declines it
#[derive(Debug, Default)]
pub struct ReviewOnly;

impl ConfirmationSurface for ReviewOnly {
    fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, ConfirmationError> {
        info!("Dry run, not committing to {}:\n{}", reference, note);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::models::ProjectKeys;

    fn reference() -> ItemReference {
        ItemReference::parse("ML-45", &ProjectKeys::parse("ML").unwrap()).unwrap()
    }

    /// Writer that keeps what was written so the test can inspect it
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_prompt_accepts_yes() {
        let output = SharedBuffer::default();
        let surface = PromptConfirmation::new(Cursor::new("Y\n"), output.clone());

        let confirmed = surface
            .confirm(&reference(), "Stand-up update:\nretrained")
            .unwrap();

        assert!(confirmed);
        let shown = String::from_utf8(output.0.lock().unwrap().clone()).unwrap();
        assert!(shown.contains("Stand-up update:\nretrained"));
        assert!(shown.contains("Add this comment to ML-45? (y/n): "));
    }

    #[test]
    fn test_prompt_treats_anything_else_as_no() {
        for answer in ["n\n", "\n", "sure\n", "yess\n"] {
            let surface = PromptConfirmation::new(Cursor::new(answer), io::sink());
            assert!(!surface.confirm(&reference(), "note").unwrap(), "{answer:?}");
        }
    }

    #[test]
    fn test_prompt_closed_input_is_an_error() {
        let surface = PromptConfirmation::new(Cursor::new(""), io::sink());
        assert!(surface.confirm(&reference(), "note").is_err());
    }

    #[test]
    fn test_scripted_answers_then_declines() {
        let surface = ScriptedConfirmation::new([true, false]);

        assert!(surface.confirm(&reference(), "a").unwrap());
        assert!(!surface.confirm(&reference(), "b").unwrap());
        assert!(!surface.confirm(&reference(), "c").unwrap());
        assert_eq!(surface.presented().len(), 3);
    }

    #[test]
    fn test_review_only_declines() {
        assert!(!ReviewOnly.confirm(&reference(), "note").unwrap());
    }
}
