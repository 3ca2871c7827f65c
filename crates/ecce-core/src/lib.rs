//! ecce — Edinburgh-style character editor (core library)
//!
//! A command line is compiled into a flat program of units and run against a
//! fixed-capacity gap buffer. Failure of any unit backtracks to the nearest
//! alternative, optional marker or enclosing group.

mod buffer;
mod compile;
mod exec;
mod host;
mod interrupt;
mod search;
mod symbol;

use std::fmt;

pub use buffer::{BufferFull, GapBuffer};
pub use compile::{compile, Command, Op, Program, Scanner, Sign, Statement, Unit, INDEFINITE, MAX_UNITS};
pub use exec::Editor;
pub use host::{Host, MemoryNotes, NoteStore, ScriptHost};
pub use interrupt::Interrupt;
pub use search::{Before, CaseMode, Matched};
pub use symbol::{classify, is_terminator, SymbolClass};

/// The command a message is about, shown as its letter in lower case followed
/// by `-` or `+` when it was signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Culprit {
    symbol: char,
    sign: Sign,
}

impl Culprit {
    pub fn new(symbol: char, sign: Sign) -> Self {
        Self { symbol, sign }
    }

    pub fn plain(symbol: char) -> Self {
        Self::new(symbol, Sign::empty())
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }
}

impl fmt::Display for Culprit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol.to_ascii_lowercase())?;
        if self.sign.contains(Sign::MINUS) {
            write!(f, "-")
        } else if self.sign.contains(Sign::PLUS) {
            write!(f, "+")
        } else {
            Ok(())
        }
    }
}

/// A statement that could not be compiled. Nothing was executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("Command {0}")]
    Command(Culprit),
    #[error("Command before {0}")]
    CommandBefore(Culprit),
    #[error("Unexpected repeat count {0}")]
    UnexpectedRepeat(Culprit),
    #[error("Text for {0}")]
    TextFor(Culprit),
    #[error("Missing {0}")]
    Missing(char),
    /// Something other than a terminator after a bare repeat count.
    #[error("? {0}")]
    AfterRepeat(Culprit),
    #[error("Command line too long")]
    TooLong,
}

/// A program stopped early. Edits made before the stop are kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("Failure: {0}")]
    Failure(Culprit),
    #[error("Escape!")]
    Interrupted,
}
