//! Collaborators the editor talks to while a program runs.

use std::collections::{HashMap, VecDeque};
use std::io;

/// Side store for noted text and secondary contexts, keyed by a slot
/// character (`'0'..='9'` or `'?'`).
pub trait NoteStore {
    fn write_note(&mut self, slot: char, text: &str) -> io::Result<()>;
    fn read_note(&mut self, slot: char) -> io::Result<String>;
}

/// The console and input stream seen by a running program.
pub trait Host: NoteStore {
    /// Write one line of output; the host adds the line ending.
    fn print(&mut self, line: &str);

    /// Next line of input for the `G` command, without its terminator.
    fn read_line(&mut self) -> Option<String>;

    /// Push text back so it is read as the next command input.
    fn unread(&mut self, text: String);
}

/// Notes held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotes {
    slots: HashMap<char, String>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: char) -> Option<&str> {
        self.slots.get(&slot).map(|s| s.as_str())
    }
}

impl NoteStore for MemoryNotes {
    fn write_note(&mut self, slot: char, text: &str) -> io::Result<()> {
        self.slots.insert(slot, text.to_string());
        Ok(())
    }

    fn read_note(&mut self, slot: char) -> io::Result<String> {
        self.slots.get(&slot).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no note in slot {slot}"))
        })
    }
}

/// A host driven by a fixed script of input lines, recording what was printed.
#[derive(Debug, Default)]
pub struct ScriptHost {
    pub output: Vec<String>,
    pub input: VecDeque<String>,
    pub unread: Vec<String>,
    pub notes: MemoryNotes,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl NoteStore for ScriptHost {
    fn write_note(&mut self, slot: char, text: &str) -> io::Result<()> {
        self.notes.write_note(slot, text)
    }

    fn read_note(&mut self, slot: char) -> io::Result<String> {
        self.notes.read_note(slot)
    }
}

impl Host for ScriptHost {
    fn print(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn unread(&mut self, text: String) {
        self.unread.push(text);
    }
}
