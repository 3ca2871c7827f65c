//! The command loop: reads statements, runs them and handles `%` commands.

use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use ecce_core::{compile, Editor, ExecError, Host, NoteStore, Program, Scanner, Statement};

use crate::meta::{self, Meta, Switch};
use crate::EcceError;

/// Where the edited text goes when the session saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stdout,
    Path(PathBuf),
    /// Kept in the session; see [`Session::saved`].
    Memory,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// `%C`: saved and finished.
    Closed,
    /// `%A`: finished without saving.
    Aborted,
    /// Command input ran out; the text went to the backup file.
    EndOfInput,
}

impl Flow {
    /// Process exit status for a session that ended this way.
    pub fn exit_code(self) -> i32 {
        match self {
            Flow::Continue | Flow::Closed => 0,
            Flow::EndOfInput => 50,
            Flow::Aborted => 60,
        }
    }
}

/// Command input, console output and note storage for one session.
pub struct Console {
    input: Box<dyn BufRead>,
    out: Box<dyn Write>,
    notes: Box<dyn NoteStore>,
    pending: VecDeque<String>,
    log: Option<Box<dyn Write>>,
    prompt: String,
    prompts: bool,
}

impl Console {
    pub fn new(input: Box<dyn BufRead>, out: Box<dyn Write>, notes: Box<dyn NoteStore>) -> Self {
        Self {
            input,
            out,
            notes,
            pending: VecDeque::new(),
            log: None,
            prompt: ">".to_string(),
            prompts: true,
        }
    }

    /// Record every command line read from input.
    pub fn with_log(mut self, log: Box<dyn Write>) -> Self {
        self.log = Some(log);
        self
    }

    /// Do not show prompts.
    pub fn quiet(mut self) -> Self {
        self.prompts = false;
        self
    }

    /// Queue command text to be read before any input. Newlines separate lines.
    pub fn queue(&mut self, commands: &str) {
        for line in commands.split('\n') {
            self.log_line(line);
            self.pending.push_back(line.to_string());
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    fn log_line(&mut self, line: &str) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = writeln!(log, "{line}") {
                log::warn!("cannot write command log: {e}");
                self.log = None;
            }
        }
    }

    /// Next line of command input, without its terminator.
    pub fn next_line(&mut self, prompt: &str) -> Option<String> {
        if let Some(line) = self.pending.pop_front() {
            return Some(line);
        }
        if self.prompts {
            if let Err(e) = write!(self.out, "{prompt}").and_then(|()| self.out.flush()) {
                log::warn!("cannot write prompt: {e}");
            }
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                if self.prompts {
                    if let Err(e) = writeln!(self.out) {
                        log::warn!("cannot write to console: {e}");
                    }
                }
                None
            }
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
                self.log_line(&trimmed);
                Some(trimmed)
            }
            Err(e) => {
                log::warn!("cannot read command input: {e}");
                None
            }
        }
    }
}

impl NoteStore for Console {
    fn write_note(&mut self, slot: char, text: &str) -> io::Result<()> {
        self.notes.write_note(slot, text)
    }

    fn read_note(&mut self, slot: char) -> io::Result<String> {
        self.notes.read_note(slot)
    }
}

impl Host for Console {
    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            log::warn!("cannot write to console: {e}");
        }
    }

    fn read_line(&mut self) -> Option<String> {
        self.next_line(":")
    }

    fn unread(&mut self, text: String) {
        self.pending.push_front(text);
    }
}

/// An editing session over one text.
pub struct Session {
    editor: Editor,
    console: Console,
    target: Target,
    backup: PathBuf,
    auto_print: bool,
    program: Option<Program>,
    /// Slot of the active secondary context.
    context: Option<char>,
    saved: Option<String>,
}

impl Session {
    pub fn new(editor: Editor, console: Console, target: Target) -> Self {
        Self {
            editor,
            console,
            target,
            backup: default_backup(),
            auto_print: true,
            program: None,
            context: None,
            saved: None,
        }
    }

    /// Print the current line after every statement that printed nothing.
    pub fn auto_print(mut self, on: bool) -> Self {
        self.auto_print = on;
        self
    }

    /// File used when the target cannot be written or input runs out.
    pub fn backup(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup = path.into();
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Text written by the last save to [`Target::Memory`].
    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    /// Read and run statements until the session finishes.
    pub fn run(&mut self) -> Result<Flow, EcceError> {
        loop {
            let prompt = self.console.prompt().to_string();
            let Some(line) = self.console.next_line(&prompt) else {
                return self.abandon();
            };
            // An interrupt raised while waiting for input applies to nothing.
            self.editor.interrupt().take();
            match self.run_line(&line)? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
    }

    /// Run the first statement of `line`. Whatever follows it is handed back
    /// as the next command input.
    pub fn run_line(&mut self, line: &str) -> Result<Flow, EcceError> {
        let mut sc = Scanner::new(line);
        let statement = compile(&mut sc);
        let meta = match statement {
            Ok(Statement::Meta) => Some(meta::parse(&mut sc)),
            _ => None,
        };
        let rest = sc.rest();
        if !rest.is_empty() {
            self.console.unread(rest);
        }

        match statement {
            Err(e) => self.console.print(&format!("* {e}")),
            Ok(Statement::Empty) => {}
            Ok(Statement::Meta) => match meta {
                Some(Ok(m)) => return self.meta(m),
                Some(Err(e)) => self.console.print(&format!("* {e}")),
                None => {}
            },
            Ok(Statement::Repeat(count)) => {
                if let Some(mut program) = self.program.take() {
                    if program.set_repeat(count) {
                        self.execute(&mut program);
                    }
                    self.program = Some(program);
                }
            }
            Ok(Statement::Program(mut program)) => {
                self.execute(&mut program);
                self.program = Some(program);
            }
        }
        Ok(Flow::Continue)
    }

    fn execute(&mut self, program: &mut Program) {
        let result = self.editor.execute(program, &mut self.console);
        if let Err(e @ ExecError::Failure(_)) = &result {
            self.console.print(&format!("* {e}"));
        }
        if self.auto_print && !self.editor.printed() {
            self.editor.print_line(&mut self.console);
        }
        if let Err(e @ ExecError::Interrupted) = &result {
            self.console.print(&format!("* {e}"));
        }
    }

    fn meta(&mut self, meta: Meta) -> Result<Flow, EcceError> {
        match meta {
            Meta::Case(mode) => self.editor.set_case_mode(mode),
            Meta::Version => self
                .console
                .print(concat!("Ecce ", env!("CARGO_PKG_VERSION"))),
            Meta::Write => {
                if self.target == Target::Stdout {
                    self.console
                        .print("* %W is not allowed when the output file is stdout");
                } else if self.ensure_main() {
                    self.save()?;
                }
            }
            Meta::Close => {
                if self.ensure_main() {
                    self.save()?;
                    return Ok(Flow::Closed);
                }
            }
            Meta::Abort => {
                self.console.print("Aborted!");
                return Ok(Flow::Aborted);
            }
            Meta::Switch(switch) => self.switch(switch),
        }
        Ok(Flow::Continue)
    }

    /// Leave any secondary context, saving it to its slot first.
    fn ensure_main(&mut self) -> bool {
        let Some(slot) = self.context else {
            return true;
        };
        let text = self.editor.secondary_text().unwrap_or_default();
        if let Err(e) = self.console.write_note(slot, &text) {
            log::warn!("cannot save context {slot}: {e}");
            self.console.print("* Cannot save context");
            return false;
        }
        self.editor.leave_secondary();
        self.context = None;
        self.console.set_prompt(">");
        true
    }

    fn switch(&mut self, switch: Switch) {
        let (slot, path) = match switch {
            Switch::Toggle => (None, None),
            Switch::Slot(slot) => (Some(slot), None),
            Switch::File { slot, path } => (Some(slot), Some(path)),
        };
        if self.context.is_some() && (!self.ensure_main() || slot.is_none()) {
            return;
        }
        let slot = slot.unwrap_or('0');
        let text = match path {
            Some(path) => match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!("cannot open {path}: {e}");
                    self.console.print("* Cannot open file");
                    return;
                }
            },
            None => match self.console.read_note(slot) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!("no context {slot}: {e}");
                    self.console.print(&format!("* Unknown context {slot}"));
                    return;
                }
            },
        };
        if self.editor.enter_secondary(&text).is_err() {
            self.console.print("* %S corrupt - no room");
            return;
        }
        self.context = Some(slot);
        self.console.set_prompt(format!("{slot}>"));
    }

    /// Write the main text to the target, falling back to the backup file.
    fn save(&mut self) -> Result<(), EcceError> {
        let text = self.editor.text();
        match &self.target {
            Target::Memory => self.saved = Some(text),
            Target::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Target::Path(path) => match write_atomic(path, &text) {
                Ok(()) => {
                    let msg = format!("Ecce {} completing.", path.display());
                    self.console.print(&msg);
                }
                Err(e) => {
                    log::warn!("cannot write {}: {e}", path.display());
                    let msg = format!(
                        "Cannot create \"{}\" - trying to save in {} instead",
                        path.display(),
                        self.backup.display()
                    );
                    self.console.print(&msg);
                    fs::write(&self.backup, text.as_bytes()).map_err(|_| EcceError::Unsaved)?;
                }
            },
        }
        Ok(())
    }

    /// Command input is exhausted: keep the text in the backup file.
    fn abandon(&mut self) -> Result<Flow, EcceError> {
        self.ensure_main();
        let text = self.editor.text();
        if self.target == Target::Memory {
            self.saved = Some(text);
            return Ok(Flow::EndOfInput);
        }
        fs::write(&self.backup, text.as_bytes())
            .map_err(|_| EcceError::BackupFailed(self.backup.clone()))?;
        let msg = format!("Ecce abandoned: saving to {}", self.backup.display());
        self.console.print(&msg);
        Ok(Flow::EndOfInput)
    }
}

fn default_backup() -> PathBuf {
    env::temp_dir().join(format!("ecce-{}.save", process::id()))
}

/// Write via a temp file in the same directory, then rename over `path`.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let perms = fs::metadata(path).map(|m| m.permissions()).ok();

    let pid = process::id();
    let mut attempt: u64 = 0;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{file_name}.ecce.tmp.{pid}.{attempt}"));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut f) => {
                f.write_all(content.as_bytes())?;
                f.sync_all()?;
                if let Some(p) = perms.clone() {
                    let _ = fs::set_permissions(&candidate, p);
                }
                break candidate;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    fs::rename(&tmp_path, path)
}
