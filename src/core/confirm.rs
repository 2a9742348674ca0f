//! Interactive confirmation gate
//!
//! One prompt, one line, three outcomes. Only a literal `y`/`Y` proceeds;
//! a literal `n`/`N` is an explicit cancellation (exit 0); anything else is
//! treated as abort-on-ambiguity (exit 1), never as "no".

use std::io::Write;

use crate::core::error::{Error, Result};

/// Classified operator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Ambiguous(String),
}

/// Classifies a raw line of operator input.
pub fn classify(input: &str) -> Answer {
    match input.trim() {
        "y" | "Y" => Answer::Yes,
        "n" | "N" => Answer::No,
        other => Answer::Ambiguous(other.to_string()),
    }
}

/// Prompts the operator and maps the answer to the pipeline's control flow.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] on an explicit no, [`Error::Ambiguous`] on
/// anything unrecognized, or an I/O error if stdin is closed.
pub fn confirm_port_change(current: u16, target: u16) -> Result<()> {
    print!("Change the SSH listening port from {current} to {target}? [y/n] ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    match classify(&line) {
        Answer::Yes => Ok(()),
        Answer::No => Err(Error::Cancelled),
        Answer::Ambiguous(input) => Err(Error::Ambiguous(input)),
    }
}
