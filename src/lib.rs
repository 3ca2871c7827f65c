//! ecce — a command-driven character editor
//!
//! This crate provides the editing session, `%` commands and note storage for
//! the `ecce` CLI. The buffer, command compiler and execution engine live in
//! `ecce-core`.

pub mod cli;
pub mod meta;
pub mod notes;
pub mod session;

#[cfg(feature = "pyo3")]
mod python;

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

pub use ecce_core::{BufferFull, CaseMode, Editor, ExecError, Interrupt, MemoryNotes, NoteStore};
pub use notes::FileNotes;
pub use session::{Console, Flow, Session, Target};

#[derive(Debug, thiserror::Error)]
pub enum EcceError {
    /// A bad option or option value.
    #[error("{0}")]
    Usage(String),
    #[error("no input file")]
    NoInput,
    #[error("File \"{0}\" not found")]
    NotFound(String),
    #[error("File too large!")]
    TooLarge(#[from] BufferFull),
    #[error("Aborted!")]
    Aborted,
    #[error("Cannot save the text in {}", .0.display())]
    BackupFailed(PathBuf),
    #[error("Cannot save the text")]
    Unsaved,
    #[error("Text is not valid UTF-8")]
    Encoding,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EcceError {
    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            EcceError::NoInput | EcceError::NotFound(_) => 30,
            EcceError::TooLarge(_) | EcceError::Aborted => 60,
            EcceError::BackupFailed(_) => 90,
            EcceError::Usage(_) | EcceError::Unsaved | EcceError::Encoding | EcceError::Io(_) => 1,
        }
    }
}

/// The outcome of [`edit_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    pub text: String,
    /// Everything the session printed, one line per output line.
    pub output: String,
}

/// Run command lines over `text` and return the edited text.
///
/// Notes stay in memory. The text is returned whether the commands end with
/// `%C` or simply run out; `%A` is an error.
pub fn edit_text(text: &str, commands: &[&str]) -> Result<EditResult, EcceError> {
    let capacity = cli::capacity_for(text.len() as u64);
    let editor = Editor::with_text(capacity, text)?;
    let out = SharedBuf::default();
    let mut console = Console::new(
        Box::new(io::empty()),
        Box::new(out.clone()),
        Box::new(MemoryNotes::new()),
    )
    .quiet();
    for line in commands {
        console.queue(line);
    }

    let mut session = Session::new(editor, console, Target::Memory);
    match session.run()? {
        Flow::Aborted => Err(EcceError::Aborted),
        _ => Ok(EditResult {
            text: session
                .saved()
                .map_or_else(|| session.editor().text(), str::to_string),
            output: out.contents(),
        }),
    }
}

/// In-memory console output that can be read back while the session holds it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn edit_and_close() {
        let res = edit_text("alpha\nbeta\n", &["m", "r3 e i/x/", "%c"]).unwrap();
        assert_eq!(res.text, "alpha\nbetx\n");
        assert_eq!(res.output, "beta\nbetx^\n");
    }

    #[test]
    fn running_out_of_commands_keeps_edits() {
        let res = edit_text("abc\n", &["e2"]).unwrap();
        assert_eq!(res.text, "c\n");
    }

    #[test]
    fn abort_is_an_error() {
        let err = edit_text("abc\n", &["e", "%a"]).unwrap_err();
        assert!(matches!(err, EcceError::Aborted));
        assert_eq!(err.exit_code(), 60);
    }

    #[test]
    fn multi_line_commands_feed_get() {
        let res = edit_text("tail\n", &["g2\nhead\nbody"]).unwrap();
        assert_eq!(res.text, "head\nbody\ntail\n");
    }

    #[test]
    fn notes_carry_text_between_places() {
        let res = edit_text("one two\n", &["n r4 a1", "r* h1"]).unwrap();
        assert_eq!(res.text, "twoone \n");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(EcceError::NotFound("x".into()).exit_code(), 30);
        assert_eq!(EcceError::TooLarge(BufferFull).exit_code(), 60);
        assert_eq!(EcceError::BackupFailed(PathBuf::from("/x")).exit_code(), 90);
        assert_eq!(EcceError::NoInput.exit_code(), 30);
        assert_eq!(EcceError::Usage("bad size".into()).exit_code(), 1);
        assert_eq!(EcceError::Unsaved.exit_code(), 1);
        assert_eq!(EcceError::NotFound("x".into()).to_string(), "File \"x\" not found");
    }
}
