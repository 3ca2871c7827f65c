//! The command compiler.
//!
//! One statement of command input (up to `;` or end of line) becomes a flat
//! array of [`Unit`]s. Groups are not a tree: while a statement is being read,
//! open `(` and `,` units are chained through their `link` fields, and a `)`
//! unwinds that chain back to its `(`, pointing every popped unit at itself.

use std::ops::Range;

use crate::symbol::{classify, is_terminator, SymbolClass as S};
use crate::{CompileError, Culprit};

/// Upper bound on units in one statement.
pub const MAX_UNITS: usize = 4095;

/// Repeat count meaning "until failure" (`!`).
pub const INDEFINITE: i64 = i64::MIN / 2;

bitflags::bitflags! {
    /// Direction qualifiers written after a command letter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Sign: u8 {
        /// Reverse direction (`-`, `^` or `~`).
        const MINUS = 0b01;
        /// Explicit forward direction (`+`).
        const PLUS  = 0b10;
    }
}

/// Editing commands, one per letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `A`: flush the noted span to a note slot.
    Mark,
    /// `B`: break the line.
    Break,
    /// `C`: change case of one character.
    Case,
    /// `D`: find and delete.
    Delete,
    /// `E`: erase one character.
    Erase,
    /// `F`: find.
    Find,
    /// `G`: get a line from input.
    Get,
    /// `H`: fetch a note slot.
    Fetch,
    /// `I`: insert text.
    Insert,
    /// `J`: join lines.
    Join,
    /// `K`: kill a line.
    Kill,
    /// `L`: left one character.
    Left,
    /// `M`: move one line.
    Move,
    /// `N`: note the point.
    Note,
    /// `P`: print the line.
    Print,
    /// `R`: right one character.
    Right,
    /// `S`: substitute the last match.
    Substitute,
    /// `T`: traverse to the end of a match.
    Traverse,
    /// `U`: uncover (delete up to) a match.
    Uncover,
    /// `V`: verify text at the point.
    Verify,
}

impl Command {
    pub fn from_letter(c: char) -> Option<Self> {
        let cmd = match c.to_ascii_uppercase() {
            'A' => Command::Mark,
            'B' => Command::Break,
            'C' => Command::Case,
            'D' => Command::Delete,
            'E' => Command::Erase,
            'F' => Command::Find,
            'G' => Command::Get,
            'H' => Command::Fetch,
            'I' => Command::Insert,
            'J' => Command::Join,
            'K' => Command::Kill,
            'L' => Command::Left,
            'M' => Command::Move,
            'N' => Command::Note,
            'P' => Command::Print,
            'R' => Command::Right,
            'S' => Command::Substitute,
            'T' => Command::Traverse,
            'U' => Command::Uncover,
            'V' => Command::Verify,
            _ => return None,
        };
        Some(cmd)
    }

    pub fn letter(self) -> char {
        match self {
            Command::Mark => 'A',
            Command::Break => 'B',
            Command::Case => 'C',
            Command::Delete => 'D',
            Command::Erase => 'E',
            Command::Find => 'F',
            Command::Get => 'G',
            Command::Fetch => 'H',
            Command::Insert => 'I',
            Command::Join => 'J',
            Command::Kill => 'K',
            Command::Left => 'L',
            Command::Move => 'M',
            Command::Note => 'N',
            Command::Print => 'P',
            Command::Right => 'R',
            Command::Substitute => 'S',
            Command::Traverse => 'T',
            Command::Uncover => 'U',
            Command::Verify => 'V',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Command(Command),
    GroupOpen,
    Comma,
    GroupClose,
    /// `\`: succeed if the previous unit failed, fail otherwise.
    Invert,
    /// `?`: tolerate failure of the previous unit.
    Optional,
    End,
}

impl Op {
    pub fn symbol(self) -> char {
        match self {
            Op::Command(c) => c.letter(),
            Op::GroupOpen => '(',
            Op::Comma => ',',
            Op::GroupClose => ')',
            Op::Invert => '\\',
            Op::Optional => '?',
            Op::End => '\0',
        }
    }
}

/// One compiled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub op: Op,
    pub sign: Sign,
    /// For `(` and `,`: the matching `)`. For `)`: its `(`, or `None` for the
    /// statement's closing unit. For anything else: the enclosing `(`.
    pub link: Option<usize>,
    /// Repeat count; `0` for `*`, [`INDEFINITE`] for `!`. On a `)` this is the
    /// live iteration counter, reset each time the group is entered.
    pub repeat: i64,
    /// Search budget in lines, or note slot for `A` and `H`.
    pub scope: i64,
    /// Text argument in the program's pool, reversed for minus variants.
    pub text: Option<Range<usize>>,
}

impl Unit {
    fn new(op: Op) -> Self {
        Self {
            op,
            sign: Sign::empty(),
            link: None,
            repeat: 1,
            scope: 0,
            text: None,
        }
    }

    pub fn is_minus(&self) -> bool {
        self.sign.contains(Sign::MINUS)
    }

    pub fn culprit(&self) -> Culprit {
        Culprit::new(self.op.symbol(), self.sign)
    }
}

/// A compiled statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub(crate) units: Vec<Unit>,
    pub(crate) text: Vec<char>,
}

impl Program {
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn text_of(&self, unit: &Unit) -> &[char] {
        match &unit.text {
            Some(r) => &self.text[r.clone()],
            None => &[],
        }
    }

    /// Set how many times the whole statement runs on its next execution.
    /// Returns false for a program with no units to repeat.
    pub fn set_repeat(&mut self, count: i64) -> bool {
        let n = self.units.len();
        if n < 3 {
            return false;
        }
        self.units[n - 2].repeat = count;
        true
    }
}

/// Result of compiling one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Nothing but terminators.
    Empty,
    Program(Program),
    /// A bare count: rerun the previous program that many times.
    Repeat(i64),
    /// `%`: the scanner is positioned after the percent sign.
    Meta,
}

/// Character source for one line of command input.
///
/// Reads past the end of the line see `'\n'`.
#[derive(Debug, Clone)]
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    pending: Option<char>,
}

#[derive(Debug, Clone, Copy)]
struct Item {
    raw: char,
    sym: char,
    class: S,
    number: i64,
}

impl Scanner {
    pub fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
            pending: None,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pending.is_none() && self.pos >= self.chars.len()
    }

    /// Next character, verbatim.
    pub fn raw(&mut self) -> char {
        if let Some(c) = self.pending.take() {
            return c;
        }
        match self.chars.get(self.pos) {
            Some(&c) => {
                self.pos += 1;
                c
            }
            None => '\n',
        }
    }

    /// Next character that is not a space.
    pub fn sym(&mut self) -> char {
        loop {
            let c = self.raw();
            if c != ' ' {
                return c;
            }
        }
    }

    pub fn unread(&mut self, c: char) {
        self.pending = Some(c);
    }

    /// Discard input up to and including the next terminator.
    pub fn skip_statement(&mut self) {
        while !is_terminator(self.sym()) {}
    }

    /// Verbatim input up to the end of the line.
    pub fn rest_of_line(&mut self) -> String {
        let mut s = String::new();
        loop {
            match self.raw() {
                '\n' => return s,
                c => s.push(c),
            }
        }
    }

    /// Unread input, for handing back to the command stream.
    pub fn rest(&self) -> String {
        let mut s = String::new();
        s.extend(self.pending);
        s.extend(&self.chars[self.pos.min(self.chars.len())..]);
        s
    }

    fn item(&mut self) -> Item {
        let raw = self.sym();
        let sym = raw.to_ascii_uppercase();
        let class = classify(sym);
        let mut number = 0;
        if class.contains(S::BANG) {
            number = INDEFINITE;
        } else if let Some(d) = sym.to_digit(10) {
            number = i64::from(d);
            loop {
                let c = self.sym();
                match c.to_digit(10) {
                    Some(d) => number = number.saturating_mul(10).saturating_add(i64::from(d)),
                    None => {
                        self.unread(c);
                        break;
                    }
                }
            }
        }
        Item {
            raw,
            sym,
            class,
            number,
        }
    }
}

/// Compile the next statement from `sc`.
///
/// On error the rest of the statement is skipped, so the scanner is ready for
/// the next one.
pub fn compile(sc: &mut Scanner) -> Result<Statement, CompileError> {
    let mut item = sc.item();
    while item.class.contains(S::TERMINATOR) {
        if sc.at_end() {
            return Ok(Statement::Empty);
        }
        item = sc.item();
    }

    if item.class.contains(S::PERCENT) {
        return Ok(Statement::Meta);
    }

    if item.class.contains(S::NUMBER) {
        let count = item.number;
        let next = sc.item();
        if !next.class.contains(S::TERMINATOR) {
            sc.skip_statement();
            return Err(CompileError::AfterRepeat(Culprit::plain(next.sym)));
        }
        return Ok(Statement::Repeat(count));
    }

    match Builder::default().build(sc, item) {
        Ok(program) => {
            log::debug!("compiled {} units", program.units.len());
            Ok(Statement::Program(program))
        }
        Err(e) => {
            sc.skip_statement();
            Err(e)
        }
    }
}

#[derive(Default)]
struct Builder {
    units: Vec<Unit>,
    text: Vec<char>,
    /// Most recent unclosed `(` or `,`; each links to the one before.
    chain: Option<usize>,
}

impl Builder {
    fn build(mut self, sc: &mut Scanner, mut item: Item) -> Result<Program, CompileError> {
        loop {
            let class = item.class;
            let culprit = Culprit::plain(item.sym);
            if class.contains(S::INVALID) {
                return Err(CompileError::Command(culprit));
            }
            if class.contains(S::DELIMITER) {
                return Err(CompileError::CommandBefore(culprit));
            }
            if class.contains(S::NUMBER) {
                return Err(CompileError::UnexpectedRepeat(culprit));
            }
            if class.contains(S::TERMINATOR) {
                return self.finish(sc);
            }
            if self.units.len() >= MAX_UNITS {
                return Err(CompileError::TooLong);
            }

            if class.contains(S::GROUP_OPEN) {
                self.open(Op::GroupOpen);
            } else if class.contains(S::COMMA) {
                self.open(Op::Comma);
            } else if class.contains(S::GROUP_CLOSE) {
                self.close(sc)?;
            } else if class.contains(S::EXT) {
                return Err(CompileError::Command(culprit));
            } else {
                self.command(sc, item)?;
            }
            item = sc.item();
        }
    }

    fn open(&mut self, op: Op) {
        let mut unit = Unit::new(op);
        unit.link = self.chain;
        self.chain = Some(self.units.len());
        self.units.push(unit);
    }

    /// Pop chained units back to the innermost `(`, pointing each at `close`.
    fn unchain(&mut self, close: usize) -> Option<usize> {
        while let Some(p) = self.chain {
            self.chain = self.units[p].link;
            self.units[p].link = Some(close);
            if self.units[p].op == Op::GroupOpen {
                return Some(p);
            }
        }
        None
    }

    fn enclosing(&self) -> Option<usize> {
        let mut p = self.chain;
        while let Some(i) = p {
            if self.units[i].op == Op::GroupOpen {
                return Some(i);
            }
            p = self.units[i].link;
        }
        None
    }

    fn close(&mut self, sc: &mut Scanner) -> Result<(), CompileError> {
        let repeat = repeat_count(sc);
        let close = self.units.len();
        let open = self.unchain(close).ok_or(CompileError::Missing('('))?;
        self.units[open].repeat = repeat;
        let mut unit = Unit::new(Op::GroupClose);
        unit.link = Some(open);
        unit.repeat = repeat;
        self.units.push(unit);
        Ok(())
    }

    fn finish(mut self, sc: &mut Scanner) -> Result<Program, CompileError> {
        let close = self.units.len();
        if self.unchain(close).is_some() {
            // The terminator is already consumed; leave one for the skip.
            sc.unread('\n');
            return Err(CompileError::Missing(')'));
        }
        self.units.push(Unit::new(Op::GroupClose));
        let mut end = Unit::new(Op::End);
        end.repeat = 0;
        self.units.push(end);
        Ok(Program {
            units: self.units,
            text: self.text,
        })
    }

    fn command(&mut self, sc: &mut Scanner, item: Item) -> Result<(), CompileError> {
        let op = match item.sym {
            '?' => Op::Optional,
            '\\' => Op::Invert,
            c => Op::Command(
                Command::from_letter(c)
                    .ok_or(CompileError::Command(Culprit::plain(c)))?,
            ),
        };
        let mut unit = Unit::new(op);
        unit.link = self.enclosing();

        if item.class.contains(S::SIGN) {
            let c = sc.sym();
            let class = classify(c);
            if class.contains(S::PLUS) {
                unit.sign = Sign::PLUS;
            } else if class.contains(S::MINUS) {
                unit.sign = Sign::MINUS;
            } else {
                sc.unread(c);
            }
        }

        if item.class.contains(S::SCOPE) {
            let default = match op {
                Op::Command(Command::Delete | Command::Uncover) => 1,
                _ => 0,
            };
            let scope = sc.item();
            unit.scope = if scope.class.contains(S::NUMBER) {
                scope.number
            } else {
                sc.unread(scope.raw);
                default
            };
        }

        if item.class.contains(S::TEXT) {
            self.text_argument(sc, &mut unit)?;
        }

        if item.class.contains(S::REPEAT) {
            unit.repeat = repeat_count(sc);
        }

        self.units.push(unit);
        Ok(())
    }

    fn text_argument(&mut self, sc: &mut Scanner, unit: &mut Unit) -> Result<(), CompileError> {
        let delim = sc.sym();
        if !classify(delim).contains(S::DELIMITER) {
            sc.unread(delim);
            return Err(CompileError::TextFor(unit.culprit()));
        }
        let mut chars = Vec::new();
        loop {
            let c = sc.raw();
            if c == delim {
                break;
            }
            if c == '\n' {
                sc.unread(c);
                break;
            }
            chars.push(c);
        }
        if unit.is_minus() {
            chars.reverse();
        }
        let start = self.text.len();
        self.text.extend(chars);
        unit.text = Some(start..self.text.len());
        Ok(())
    }
}

fn repeat_count(sc: &mut Scanner) -> i64 {
    let item = sc.item();
    if item.class.contains(S::NUMBER) {
        item.number
    } else {
        sc.unread(item.raw);
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(line: &str) -> Program {
        match compile(&mut Scanner::new(line)).unwrap() {
            Statement::Program(p) => p,
            other => panic!("expected program, got {other:?}"),
        }
    }

    fn ops(p: &Program) -> String {
        p.units().iter().map(|u| u.op.symbol()).filter(|&c| c != '\0').collect()
    }

    #[test]
    fn simple_commands_and_counts() {
        let p = program("r3 l* m!");
        assert_eq!(ops(&p), "RLM)");
        assert_eq!(p.units()[0].repeat, 3);
        assert_eq!(p.units()[1].repeat, 0);
        assert_eq!(p.units()[2].repeat, INDEFINITE);
        assert_eq!(p.units().last().map(|u| u.op), Some(Op::End));
    }

    #[test]
    fn signs_and_culprits() {
        let p = program("r- m+ k^");
        assert_eq!(p.units()[0].sign, Sign::MINUS);
        assert_eq!(p.units()[1].sign, Sign::PLUS);
        assert_eq!(p.units()[2].sign, Sign::MINUS);
        assert_eq!(p.units()[0].culprit().to_string(), "r-");
        assert_eq!(p.units()[1].culprit().to_string(), "m+");
    }

    #[test]
    fn text_arguments_and_scope() {
        let p = program("f3/a b/2 i-'xyz' d.q.");
        let f = &p.units()[0];
        assert_eq!(f.scope, 3);
        assert_eq!(f.repeat, 2);
        assert_eq!(p.text_of(f), &['a', ' ', 'b']);
        let i = &p.units()[1];
        assert_eq!(p.text_of(i).iter().collect::<String>(), "zyx");
        let d = &p.units()[2];
        assert_eq!(d.scope, 1);
        assert_eq!(p.text_of(d), &['q']);
    }

    #[test]
    fn text_runs_to_end_of_line() {
        let p = program("i/abc");
        assert_eq!(p.text_of(&p.units()[0]).iter().collect::<String>(), "abc");
        assert_eq!(ops(&p), "I)");
    }

    #[test]
    fn text_may_contain_terminator() {
        let mut sc = Scanner::new("i/a;b/;p");
        let Statement::Program(p) = compile(&mut sc).unwrap() else { panic!() };
        assert_eq!(p.text_of(&p.units()[0]).iter().collect::<String>(), "a;b");
        assert_eq!(sc.rest(), "p");
    }

    #[test]
    fn note_slots() {
        let p = program("a3 h h!");
        assert_eq!(p.units()[0].scope, 3);
        assert_eq!(p.units()[1].scope, 0);
        assert_eq!(p.units()[2].scope, INDEFINITE);
    }

    #[test]
    fn group_links_are_resolved() {
        let p = program("(r,l,m)3 e");
        let u = p.units();
        assert_eq!(ops(&p), "(R,L,M)E)");
        assert_eq!(u[0].link, Some(6));
        assert_eq!(u[0].repeat, 3);
        assert_eq!(u[2].link, Some(6));
        assert_eq!(u[4].link, Some(6));
        assert_eq!(u[6].link, Some(0));
        assert_eq!(u[6].repeat, 3);
        assert_eq!(u[1].link, Some(0));
        assert_eq!(u[7].link, None);
        assert_eq!(u[8].link, None);
    }

    #[test]
    fn nested_groups_and_top_level_comma() {
        let p = program("((r)2,l)* , m");
        let u = p.units();
        assert_eq!(ops(&p), "((R),L),M)");
        // outer ( at 0, inner ( at 1, inner ) at 3, comma at 4, outer ) at 6
        assert_eq!(u[1].link, Some(3));
        assert_eq!(u[3].link, Some(1));
        assert_eq!(u[2].link, Some(1));
        assert_eq!(u[0].link, Some(6));
        assert_eq!(u[4].link, Some(6));
        assert_eq!(u[0].repeat, 0);
        assert_eq!(u[7].op, Op::Comma);
        assert_eq!(u[7].link, Some(9));
        assert_eq!(u[9].op, Op::GroupClose);
    }

    #[test]
    fn alternate_brackets() {
        let p = program("[r]2 <l>");
        assert_eq!(ops(&p), "(R)(L))");
    }

    #[test]
    fn missing_close_is_reported() {
        let mut sc = Scanner::new("(r;p");
        assert_eq!(compile(&mut sc).unwrap_err(), CompileError::Missing(')'));
        assert_eq!(sc.rest(), "p");
    }

    #[test]
    fn missing_open_is_reported() {
        let mut sc = Scanner::new("r)2 l;p");
        assert_eq!(compile(&mut sc).unwrap_err(), CompileError::Missing('('));
        assert_eq!(sc.rest(), "p");
    }

    #[test]
    fn syntax_errors_name_the_culprit() {
        let err = |s: &str| compile(&mut Scanner::new(s)).unwrap_err().to_string();
        assert_eq!(err("q"), "Command q");
        assert_eq!(err("r/"), "Command before /");
        assert_eq!(err("n3"), "Unexpected repeat count 3");
        assert_eq!(err("f-x"), "Text for f-");
        assert_eq!(err("r+-"), "Command -");
        assert_eq!(err("5 r"), "? r");
    }

    #[test]
    fn leading_terminators_and_empty_lines() {
        assert_eq!(compile(&mut Scanner::new(";;")).unwrap(), Statement::Empty);
        assert_eq!(compile(&mut Scanner::new("")).unwrap(), Statement::Empty);
        let mut sc = Scanner::new(";; r");
        assert!(matches!(compile(&mut sc).unwrap(), Statement::Program(_)));
    }

    #[test]
    fn bare_count_and_meta() {
        assert_eq!(compile(&mut Scanner::new("12")).unwrap(), Statement::Repeat(12));
        assert_eq!(compile(&mut Scanner::new("*")).unwrap(), Statement::Repeat(0));
        let mut sc = Scanner::new("%c");
        assert_eq!(compile(&mut sc).unwrap(), Statement::Meta);
        assert_eq!(sc.rest(), "c");
    }

    #[test]
    fn statements_split_on_semicolon() {
        let mut sc = Scanner::new("r;l2");
        assert!(matches!(compile(&mut sc).unwrap(), Statement::Program(_)));
        assert_eq!(sc.rest(), "l2");
    }

    #[test]
    fn set_repeat_targets_statement_close() {
        let mut p = program("r");
        assert!(p.set_repeat(4));
        assert_eq!(p.units()[1].repeat, 4);
        assert_eq!(p.units()[1].op, Op::GroupClose);
    }

    #[test]
    fn too_many_units() {
        let line = "r".repeat(MAX_UNITS + 1);
        assert_eq!(
            compile(&mut Scanner::new(&line)).unwrap_err(),
            CompileError::TooLong
        );
    }
}
