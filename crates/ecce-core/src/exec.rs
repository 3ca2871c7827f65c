//! The execution engine.

use crate::buffer::{BufferFull, GapBuffer};
use crate::compile::{Command, Op, Program, Unit};
use crate::host::Host;
use crate::interrupt::Interrupt;
use crate::search::{Before, CaseMode, Matched};
use crate::ExecError;

/// Point and gap size recorded by `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Note {
    at: usize,
    gap: usize,
}

/// Editing session state: the buffer plus everything commands remember
/// between units.
#[derive(Debug, Clone)]
pub struct Editor {
    pub(crate) buf: GapBuffer,
    pub(crate) case: CaseMode,
    pub(crate) matched: Matched,
    pub(crate) before: Before,
    note: Option<Note>,
    printed: bool,
    interrupt: Interrupt,
}

impl Editor {
    pub fn new(buf: GapBuffer) -> Self {
        Self {
            buf,
            case: CaseMode::default(),
            matched: Matched::default(),
            before: Before::default(),
            note: None,
            printed: false,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_text(capacity: usize, text: &str) -> Result<Self, BufferFull> {
        Ok(Self::new(GapBuffer::with_text(capacity, text)?))
    }

    pub fn buffer(&self) -> &GapBuffer {
        &self.buf
    }

    pub fn text(&self) -> String {
        self.buf.text()
    }

    pub fn case_mode(&self) -> CaseMode {
        self.case
    }

    pub fn set_case_mode(&mut self, mode: CaseMode) {
        self.case = mode;
    }

    /// Whether the last program printed anything itself.
    pub fn printed(&self) -> bool {
        self.printed
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Share `interrupt` with whoever raises it.
    pub fn set_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt = interrupt;
    }

    pub fn in_secondary(&self) -> bool {
        self.buf.in_secondary()
    }

    /// Swap in a secondary text. Match and note state do not carry over.
    pub fn enter_secondary(&mut self, text: &str) -> Result<(), BufferFull> {
        self.buf.enter_secondary(text)?;
        self.forget_marks();
        Ok(())
    }

    /// Return to the main text, handing back the secondary text.
    pub fn leave_secondary(&mut self) -> Option<String> {
        let text = self.buf.leave_secondary()?;
        self.forget_marks();
        Some(text)
    }

    /// Text of the current secondary region, if one is active.
    pub fn secondary_text(&self) -> Option<String> {
        self.in_secondary().then(|| self.buf.text())
    }

    fn forget_marks(&mut self) {
        self.matched = Matched::default();
        self.before = Before::default();
        self.note = None;
    }

    pub(crate) fn check_interrupt(&self) -> Result<(), ExecError> {
        if self.interrupt.take() {
            return Err(ExecError::Interrupted);
        }
        Ok(())
    }

    /// Run a compiled program. Group counters live in the program, so the
    /// same program can be run again.
    pub fn execute(&mut self, program: &mut Program, host: &mut dyn Host) -> Result<(), ExecError> {
        self.printed = false;
        let mut at = 0;
        loop {
            self.check_interrupt()?;
            let unit = &program.units[at];
            let (op, link, repeat) = (unit.op, unit.link, unit.repeat);
            at = match op {
                Op::End => return Ok(()),
                Op::GroupOpen => {
                    if let Some(close) = link {
                        program.units[close].repeat = repeat;
                    }
                    at + 1
                }
                Op::Comma => link.unwrap_or(at + 1),
                Op::GroupClose => {
                    program.units[at].repeat -= 1;
                    if program.units[at].repeat != 0 {
                        link.map_or(0, |open| open + 1)
                    } else {
                        at + 1
                    }
                }
                Op::Optional => at + 1,
                Op::Invert => self.recover(program, at, 0)?,
                Op::Command(cmd) => self.run_command(program, at, cmd, host)?,
            };
        }
    }

    fn run_command(
        &mut self,
        program: &mut Program,
        at: usize,
        cmd: Command,
        host: &mut dyn Host,
    ) -> Result<usize, ExecError> {
        let unit = program.units[at].clone();
        let mut remaining = unit.repeat;
        loop {
            self.check_interrupt()?;
            let ok = self.apply(cmd, &unit, program.text_of(&unit), remaining, host)?;
            remaining -= 1;
            if !ok {
                log::debug!("{} failed, {} to go", unit.culprit(), remaining);
                return self.recover(program, at, remaining);
            }
            if remaining == 0 {
                return Ok(at + 1);
            }
        }
    }

    /// Find where execution resumes after the unit at `at` failed with
    /// `remaining` repetitions outstanding.
    fn recover(&mut self, program: &mut Program, at: usize, remaining: i64) -> Result<usize, ExecError> {
        let culprit = program.units[at].culprit();
        let units = &mut program.units;
        let mut at = at;
        let mut remaining = remaining;
        loop {
            self.check_interrupt()?;
            // An indefinite repeat ends by failing.
            if remaining < 0 {
                return Ok(at + 1);
            }
            if matches!(units[at + 1].op, Op::Invert | Op::Optional) {
                return Ok(at + 2);
            }
            loop {
                at += 1;
                match units[at].op {
                    Op::GroupOpen => at = units[at].link.unwrap_or(at),
                    Op::Comma => return Ok(at + 1),
                    Op::GroupClose => {
                        units[at].repeat -= 1;
                        remaining = units[at].repeat;
                        break;
                    }
                    Op::End => return Err(ExecError::Failure(culprit)),
                    _ => {}
                }
            }
        }
    }

    fn apply(
        &mut self,
        cmd: Command,
        unit: &Unit,
        text: &[char],
        remaining: i64,
        host: &mut dyn Host,
    ) -> Result<bool, ExecError> {
        let all = remaining == 0;
        let ok = match (cmd, unit.is_minus()) {
            (Command::Right, false) | (Command::Left, true) => {
                let ok = if all {
                    self.buf.right_star();
                    false
                } else {
                    self.buf.right()
                };
                self.matched.start_back = None;
                ok
            }
            (Command::Left, false) | (Command::Right, true) => {
                let ok = if all {
                    self.buf.left_star();
                    false
                } else {
                    self.buf.left()
                };
                self.matched.start = None;
                ok
            }
            (Command::Erase, false) => {
                if all {
                    self.buf.erase_to_line_end();
                    false
                } else {
                    self.buf.erase_ahead()
                }
            }
            (Command::Erase, true) => {
                if all {
                    self.buf.erase_to_line_start();
                    false
                } else {
                    self.buf.erase_behind()
                }
            }
            (Command::Case, minus) => {
                let case = self.case;
                if minus {
                    self.buf.transfer_behind(|c| case.transliterate(c))
                } else {
                    self.buf.transfer_ahead(|c| case.transliterate(c))
                }
            }
            (Command::Move, false) => {
                let ok = if all {
                    self.buf.move_to_end();
                    false
                } else {
                    self.buf.move_down()
                };
                self.matched.start_back = None;
                ok
            }
            (Command::Move, true) => {
                let ok = if all {
                    self.buf.move_to_start();
                    false
                } else {
                    let ok = self.buf.move_up();
                    self.buf.left_star();
                    ok
                };
                self.matched.start = None;
                ok
            }
            (Command::Break, false) => self.buf.break_line(),
            (Command::Break, true) => self.buf.break_line_ahead(),
            (Command::Join, false) => self.buf.join_next(),
            (Command::Join, true) => self.buf.join_previous(),
            (Command::Kill, false) => self.buf.kill_line(),
            (Command::Kill, true) => self.buf.move_up() && self.buf.kill_line(),
            (Command::Print, minus) => {
                self.print_line(host);
                if remaining == 1 {
                    true
                } else if minus {
                    let ok = self.buf.move_up();
                    self.buf.left_star();
                    ok
                } else {
                    self.buf.move_down()
                }
            }
            (Command::Get, minus) => self.get(host, minus),
            (Command::Verify, false) => self.verify(text),
            (Command::Verify, true) => self.verify_back(text),
            (Command::Find, false) => self.find(text, unit.scope)?,
            (Command::Find, true) => self.find_back(text, unit.scope)?,
            (Command::Uncover, false) => {
                if !self.find(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.discard_behind_to(self.before.front);
                self.buf.recompute_line_start();
                true
            }
            (Command::Uncover, true) => {
                if !self.find_back(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.discard_ahead_to(self.before.back);
                self.buf.recompute_line_end();
                true
            }
            (Command::Delete, false) => {
                if !self.find(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.discard_ahead_to(self.matched.limit);
                self.matched.start = Some(self.buf.back());
                true
            }
            (Command::Delete, true) => {
                if !self.find_back(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.discard_behind_to(self.matched.limit_back);
                self.matched.start_back = Some(self.buf.front());
                true
            }
            (Command::Traverse, false) => {
                if !self.find(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.copy_ahead_to(self.matched.limit);
                true
            }
            (Command::Traverse, true) => {
                if !self.find_back(text, unit.scope)? {
                    return Ok(false);
                }
                self.buf.copy_behind_to(self.matched.limit_back);
                true
            }
            (Command::Insert, false) => self.insert(text),
            (Command::Insert, true) => self.insert_ahead(text),
            (Command::Substitute, minus) => {
                // The span may have been edited since it matched.
                if self.matched.start == Some(self.buf.back()) {
                    self.buf.discard_ahead_to(self.matched.limit);
                    self.buf.recompute_line_end();
                } else if self.matched.start_back == Some(self.buf.front()) {
                    self.buf.discard_behind_to(self.matched.limit_back);
                    self.buf.recompute_line_start();
                } else {
                    return Ok(false);
                }
                if minus {
                    self.insert_ahead(text)
                } else {
                    self.insert(text)
                }
            }
            (Command::Note, _) => {
                self.note = Some(Note {
                    at: self.buf.front(),
                    gap: self.buf.free(),
                });
                true
            }
            (Command::Mark, _) => self.mark(host, note_slot(unit.scope)),
            (Command::Fetch, _) => self.fetch(host, note_slot(unit.scope)),
        };
        Ok(ok)
    }

    /// Insert behind the point. Characters that fit stay even if the rest do not.
    fn insert(&mut self, text: &[char]) -> bool {
        self.matched.limit_back = self.buf.front();
        let ok = text.iter().all(|&c| self.buf.insert(c));
        self.matched.start_back = Some(self.buf.front());
        self.matched.start = None;
        ok
    }

    /// Insert ahead of the point; `text` is reversed.
    fn insert_ahead(&mut self, text: &[char]) -> bool {
        self.matched.limit = self.buf.back();
        let ok = text.iter().all(|&c| self.buf.insert_ahead(c));
        self.matched.start = Some(self.buf.back());
        self.matched.start_back = None;
        ok
    }

    /// Read a line of input and insert it above the current line. A line
    /// starting with `:` is handed back as command input instead.
    fn get(&mut self, host: &mut dyn Host, minus: bool) -> bool {
        let Some(line) = host.read_line() else {
            return false;
        };
        if let Some(rest) = line.strip_prefix(':') {
            if !rest.is_empty() {
                host.unread(rest.to_string());
                self.printed = true;
            }
            return false;
        }
        self.buf.left_star();
        let ok = line
            .chars()
            .filter(|&c| c != '\r')
            .chain(std::iter::once('\n'))
            .all(|c| self.buf.insert(c));
        self.buf.recompute_line_start();
        if minus {
            self.buf.move_up();
            self.printed = true;
        }
        ok
    }

    fn mark(&mut self, host: &mut dyn Host, slot: char) -> bool {
        let front = self.buf.front();
        let Some(note) = self.note else {
            return false;
        };
        if note.at >= front || note.gap != self.buf.free() {
            return false;
        }
        let text: String = self.buf.slice(note.at, front).iter().collect();
        if let Err(e) = host.write_note(slot, &text) {
            log::warn!("cannot write note {slot}: {e}");
            return false;
        }
        self.buf.discard_behind_to(note.at);
        self.buf.recompute_line_start();
        self.note = None;
        true
    }

    fn fetch(&mut self, host: &mut dyn Host, slot: char) -> bool {
        let text = match host.read_note(slot) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("cannot read note {slot}: {e}");
                return false;
            }
        };
        let ok = text.chars().all(|c| self.buf.insert(c));
        self.buf.recompute_line_start();
        ok
    }

    /// Print the current line with the point shown as `^`.
    pub fn print_line(&mut self, host: &mut dyn Host) {
        let b = &self.buf;
        let (line_start, front) = (b.line_start(), b.front());
        let note = self.note.map(|n| n.at);
        let mut out = String::new();
        for i in line_start..=front {
            if note == Some(i) {
                out.push_str("*** Note ***");
                if i == line_start {
                    out.push('\n');
                }
            }
            if i == front {
                if i != line_start {
                    out.push('^');
                }
                break;
            }
            push_visible(&mut out, b.cell(i));
        }
        for i in b.back()..=b.line_end() {
            if note == Some(i) {
                out.push_str("*** Note ***");
            }
            if i == b.line_end() {
                break;
            }
            push_visible(&mut out, b.cell(i));
        }
        if b.line_end() == b.region_end() {
            out.push_str("*** End ***");
        }
        host.print(&out);
        self.printed = true;
    }
}

fn push_visible(out: &mut String, c: char) {
    let n = u32::from(c);
    if n < 32 || n == 127 {
        out.push_str(&format!("<{n}>"));
    } else {
        out.push(c);
    }
}

/// Note slot named by an `A` or `H` scope.
fn note_slot(scope: i64) -> char {
    match u32::try_from(scope) {
        Ok(n @ 0..=9) => char::from_digit(n, 10).unwrap_or('?'),
        _ => '?',
    }
}
