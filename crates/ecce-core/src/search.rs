//! Verify and find.
//!
//! Patterns for the backward commands arrive reversed, so both directions
//! compare pattern index `i` against the `i`th character away from the point.

use crate::exec::Editor;
use crate::ExecError;

/// How letters compare in searches and what `C` does to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// `%L`: searches match lower case; `C` lowers.
    Lower,
    /// `%U`: searches match upper case; `C` raises.
    Upper,
    /// `%N`: searches are exact; `C` flips.
    Normal,
    /// `%E`: searches ignore case; `C` flips.
    #[default]
    Either,
}

impl CaseMode {
    pub fn fold(self, c: char) -> char {
        match self {
            CaseMode::Lower => c.to_ascii_lowercase(),
            CaseMode::Upper | CaseMode::Either => c.to_ascii_uppercase(),
            CaseMode::Normal => c,
        }
    }

    pub fn transliterate(self, c: char) -> char {
        match self {
            CaseMode::Lower => c.to_ascii_lowercase(),
            CaseMode::Upper => c.to_ascii_uppercase(),
            CaseMode::Normal | CaseMode::Either => {
                if c.is_ascii_lowercase() {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            }
        }
    }

    fn same(self, a: char, b: char) -> bool {
        self.fold(a) == self.fold(b)
    }
}

/// Span recorded by the last successful match or insertion.
///
/// `start` is the point's `back` index when the span lies ahead of the point,
/// `start_back` its `front` index when the span lies behind it. At most one is
/// set after any match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Matched {
    pub start: Option<usize>,
    pub limit: usize,
    pub start_back: Option<usize>,
    pub limit_back: usize,
}

/// Point saved when a find begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Before {
    pub front: usize,
    pub back: usize,
}

impl Editor {
    /// Does `pattern` lie immediately ahead of the point?
    pub fn verify(&mut self, pattern: &[char]) -> bool {
        let back = self.buf.back();
        let hit = pattern
            .iter()
            .enumerate()
            .all(|(i, &p)| self.case.same(p, self.buf.cell(back + i)));
        if hit {
            self.matched.start = Some(back);
            self.matched.limit = back + pattern.len();
            self.matched.start_back = None;
        }
        hit
    }

    /// Does reversed `pattern` lie immediately behind the point?
    pub fn verify_back(&mut self, pattern: &[char]) -> bool {
        let hit = pattern
            .iter()
            .enumerate()
            .all(|(i, &p)| self.case.same(p, self.buf.behind(i)));
        if hit {
            let front = self.buf.front();
            self.matched.start_back = Some(front);
            self.matched.limit_back = front - pattern.len();
            self.matched.start = None;
        }
        hit
    }

    /// Move forward to the next occurrence of `pattern`, leaving the point just
    /// before it. `scope` bounds the number of lines searched; 0 is unbounded.
    pub fn find(&mut self, pattern: &[char], scope: i64) -> Result<bool, ExecError> {
        self.before.front = self.buf.front();
        if self.matched.start == Some(self.buf.back()) && !self.buf.right() {
            self.buf.move_down();
        }
        let mut budget = scope;
        loop {
            self.check_interrupt()?;
            if self.verify(pattern) {
                return Ok(true);
            }
            if !self.buf.right() {
                budget -= 1;
                if budget == 0 || !self.buf.move_down() {
                    return Ok(false);
                }
            }
        }
    }

    /// Move backward to the previous occurrence, leaving the point just after it.
    pub fn find_back(&mut self, pattern: &[char], scope: i64) -> Result<bool, ExecError> {
        self.before.back = self.buf.back();
        if self.matched.start_back == Some(self.buf.front()) && !self.buf.left() {
            self.buf.move_up();
        }
        let mut budget = scope;
        loop {
            self.check_interrupt()?;
            if self.verify_back(pattern) {
                return Ok(true);
            }
            if !self.buf.left() {
                budget -= 1;
                if budget == 0 || !self.buf.move_up() {
                    return Ok(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GapBuffer;

    fn editor(text: &str) -> Editor {
        Editor::new(GapBuffer::with_text(256, text).unwrap())
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn rev(s: &str) -> Vec<char> {
        s.chars().rev().collect()
    }

    #[test]
    fn case_modes() {
        assert_eq!(CaseMode::Either.fold('a'), 'A');
        assert_eq!(CaseMode::Lower.fold('Q'), 'q');
        assert_eq!(CaseMode::Normal.fold('q'), 'q');
        assert_eq!(CaseMode::Either.transliterate('a'), 'A');
        assert_eq!(CaseMode::Normal.transliterate('Z'), 'z');
        assert_eq!(CaseMode::Upper.transliterate('Z'), 'Z');
        assert_eq!(CaseMode::Lower.transliterate('7'), '7');
        assert_eq!(CaseMode::Either.transliterate('é'), 'é');
    }

    #[test]
    fn verify_ignores_case_by_default() {
        let mut ed = editor("Hello\n");
        assert!(ed.verify(&chars("hEL")));
        assert!(!ed.verify(&chars("help")));
        ed.set_case_mode(CaseMode::Normal);
        assert!(!ed.verify(&chars("hel")));
        assert!(ed.verify(&chars("Hel")));
    }

    #[test]
    fn verify_does_not_cross_line_end() {
        let mut ed = editor("ab\ncd\n");
        assert!(!ed.verify(&chars("abc")));
    }

    #[test]
    fn find_moves_across_lines() {
        let mut ed = editor("one\ntwo\nthree\n");
        assert!(ed.find(&chars("re"), 0).unwrap());
        assert_eq!(ed.buffer().current_line(), "three");
        assert_eq!(ed.buffer().text_after(), "ree\n");
    }

    #[test]
    fn find_again_skips_current_match() {
        let mut ed = editor("abab\n");
        assert!(ed.find(&chars("ab"), 0).unwrap());
        assert_eq!(ed.buffer().text_before(), "");
        assert!(ed.find(&chars("ab"), 0).unwrap());
        assert_eq!(ed.buffer().text_before(), "ab");
        assert!(!ed.find(&chars("ab"), 0).unwrap());
    }

    #[test]
    fn find_respects_scope() {
        let mut ed = editor("a\nb\nc\n");
        assert!(!ed.find(&chars("c"), 2).unwrap());
        let mut ed = editor("a\nb\nc\n");
        assert!(ed.find(&chars("c"), 3).unwrap());
    }

    #[test]
    fn find_back_leaves_point_after_match() {
        let mut ed = editor("one\ntwo\nthree\n");
        ed.buf.move_to_end();
        assert!(ed.find_back(&rev("tw"), 0).unwrap());
        assert_eq!(ed.buffer().current_line(), "two");
        assert_eq!(ed.buffer().text_before(), "one\ntw");
        assert_eq!(ed.matched.start_back, Some(ed.buf.front()));
    }

    #[test]
    fn find_is_interruptible() {
        let mut ed = editor("x\n");
        ed.interrupt().raise();
        assert_eq!(ed.find(&chars("y"), 0), Err(ExecError::Interrupted));
        assert!(!ed.interrupt().is_raised());
    }
}
