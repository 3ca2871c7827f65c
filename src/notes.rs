use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ecce_core::NoteStore;

/// Note slots kept as `Note<slot>` files in one directory.
#[derive(Debug, Clone)]
pub struct FileNotes {
    dir: PathBuf,
}

impl FileNotes {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Notes in the system temp directory, shared by every session of the user.
    pub fn in_temp_dir() -> Self {
        Self::new(env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, slot: char) -> PathBuf {
        self.dir.join(format!("Note{slot}"))
    }
}

impl NoteStore for FileNotes {
    fn write_note(&mut self, slot: char, text: &str) -> io::Result<()> {
        fs::write(self.path(slot), text.as_bytes())
    }

    fn read_note(&mut self, slot: char) -> io::Result<String> {
        fs::read_to_string(self.path(slot))
    }
}
