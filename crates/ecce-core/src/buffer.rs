//! Fixed-capacity gap buffer.
//!
//! The text lives in one array of cells split by a gap at the point:
//!
//! ```text
//!  \n  o n e \n t w . . . . o \n n e x t \n l a s t  \n
//!      ^       ^   ^        ^  ^                     ^
//!      start   ls  front    back line_end            end
//! ```
//!
//! `front` is exclusive and `back` inclusive, so the buffer is full when they
//! are equal. The cell before `start` and the cell at `end` always hold `'\n'`,
//! which lets line scans run without bounds checks against the region.

use std::fmt;

/// The gap is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer full")]
pub struct BufferFull;

#[derive(Debug, Clone)]
pub struct GapBuffer {
    cells: Vec<char>,
    start: usize,
    end: usize,
    front: usize,
    back: usize,
    line_start: usize,
    line_end: usize,
    secondary: bool,
}

impl GapBuffer {
    /// An empty buffer able to hold `capacity - 1` characters.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        let cells = vec!['\n'; capacity + 1];
        Self {
            cells,
            start: 1,
            end: capacity,
            front: 1,
            back: capacity,
            line_start: 1,
            line_end: capacity,
            secondary: false,
        }
    }

    /// A buffer seeded with `text`, point at the start. Carriage returns are dropped.
    pub fn with_text(capacity: usize, text: &str) -> Result<Self, BufferFull> {
        let mut buf = Self::new(capacity);
        let chars: Vec<char> = text.chars().filter(|&c| c != '\r').collect();
        buf.fill_back(&chars)?;
        Ok(buf)
    }

    fn fill_back(&mut self, chars: &[char]) -> Result<(), BufferFull> {
        if chars.len() > self.back - self.front {
            return Err(BufferFull);
        }
        self.back = self.end - chars.len();
        self.cells[self.back..self.end].copy_from_slice(chars);
        self.line_start = self.front;
        self.line_end = self.scan_line_end(self.back);
        Ok(())
    }

    /// Total number of cells available to live text in the primary region.
    pub fn capacity(&self) -> usize {
        self.cells.len() - 2
    }

    /// Characters currently in the live region.
    pub fn len(&self) -> usize {
        (self.front - self.start) + (self.end - self.back)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free cells left in the gap.
    pub fn free(&self) -> usize {
        self.back - self.front
    }

    pub fn is_full(&self) -> bool {
        self.front == self.back
    }

    /// Logical offset of the point within the region.
    pub fn point(&self) -> usize {
        self.front - self.start
    }

    pub fn in_secondary(&self) -> bool {
        self.secondary
    }

    pub(crate) fn front(&self) -> usize {
        self.front
    }

    pub(crate) fn back(&self) -> usize {
        self.back
    }

    pub(crate) fn line_start(&self) -> usize {
        self.line_start
    }

    pub(crate) fn line_end(&self) -> usize {
        self.line_end
    }

    pub(crate) fn region_start(&self) -> usize {
        self.start
    }

    pub(crate) fn region_end(&self) -> usize {
        self.end
    }

    /// Cell at a raw index; out-of-range reads see the line terminator.
    pub(crate) fn cell(&self, index: usize) -> char {
        self.cells.get(index).copied().unwrap_or('\n')
    }

    /// Character `offset` cells behind the point, crossing into the sentinel.
    pub(crate) fn behind(&self, offset: usize) -> char {
        match self.front.checked_sub(offset + 1) {
            Some(i) => self.cells[i],
            None => '\n',
        }
    }

    pub(crate) fn slice(&self, from: usize, to: usize) -> &[char] {
        &self.cells[from..to]
    }

    /// Whole region in logical order.
    pub fn text(&self) -> String {
        let mut s = String::with_capacity(self.len());
        s.extend(&self.cells[self.start..self.front]);
        s.extend(&self.cells[self.back..self.end]);
        s
    }

    /// Text before the point.
    pub fn text_before(&self) -> String {
        self.cells[self.start..self.front].iter().collect()
    }

    /// Text from the point onwards.
    pub fn text_after(&self) -> String {
        self.cells[self.back..self.end].iter().collect()
    }

    /// The line containing the point, without its terminator.
    pub fn current_line(&self) -> String {
        let mut s: String = self.cells[self.line_start..self.front].iter().collect();
        s.extend(&self.cells[self.back..self.line_end]);
        s
    }

    fn scan_line_end(&self, from: usize) -> usize {
        let mut i = from;
        while self.cells[i] != '\n' {
            i += 1;
        }
        i
    }

    fn scan_line_start(&self, from: usize) -> usize {
        let mut i = from;
        while self.cells[i - 1] != '\n' {
            i -= 1;
        }
        i
    }

    pub(crate) fn recompute_line_start(&mut self) {
        self.line_start = self.scan_line_start(self.front);
    }

    pub(crate) fn recompute_line_end(&mut self) {
        self.line_end = self.scan_line_end(self.back);
    }

    // Motion within the line.

    pub fn right(&mut self) -> bool {
        if self.back == self.line_end {
            return false;
        }
        self.cells[self.front] = self.cells[self.back];
        self.front += 1;
        self.back += 1;
        true
    }

    pub fn left(&mut self) -> bool {
        if self.front == self.line_start {
            return false;
        }
        self.front -= 1;
        self.back -= 1;
        self.cells[self.back] = self.cells[self.front];
        true
    }

    pub fn right_star(&mut self) {
        let n = self.line_end - self.back;
        self.cells.copy_within(self.back..self.line_end, self.front);
        self.front += n;
        self.back += n;
    }

    pub fn left_star(&mut self) {
        let n = self.front - self.line_start;
        self.cells.copy_within(self.line_start..self.front, self.back - n);
        self.front -= n;
        self.back -= n;
    }

    // Motion across lines.

    /// Point to the start of the next line.
    pub fn move_down(&mut self) -> bool {
        self.right_star();
        if self.back == self.end {
            return false;
        }
        self.cells[self.front] = self.cells[self.back];
        self.front += 1;
        self.back += 1;
        self.line_start = self.front;
        self.line_end = self.scan_line_end(self.back);
        true
    }

    /// Point to the end of the previous line.
    pub fn move_up(&mut self) -> bool {
        self.left_star();
        if self.front == self.start {
            return false;
        }
        self.front -= 1;
        self.back -= 1;
        self.cells[self.back] = self.cells[self.front];
        self.line_end = self.back;
        self.line_start = self.scan_line_start(self.front);
        true
    }

    pub fn move_to_end(&mut self) {
        let n = self.end - self.back;
        self.cells.copy_within(self.back..self.end, self.front);
        self.front += n;
        self.back = self.end;
        self.line_end = self.end;
        self.line_start = self.scan_line_start(self.front);
    }

    pub fn move_to_start(&mut self) {
        let n = self.front - self.start;
        self.cells.copy_within(self.start..self.front, self.back - n);
        self.front = self.start;
        self.back -= n;
        self.line_start = self.start;
        self.line_end = self.scan_line_end(self.back);
    }

    // Insertion. A full gap fails at the character that does not fit.

    /// Insert behind the point (the point advances).
    pub fn insert(&mut self, c: char) -> bool {
        if self.is_full() {
            return false;
        }
        self.cells[self.front] = c;
        self.front += 1;
        true
    }

    /// Insert ahead of the point (the point stays).
    pub fn insert_ahead(&mut self, c: char) -> bool {
        if self.is_full() {
            return false;
        }
        self.back -= 1;
        self.cells[self.back] = c;
        true
    }

    pub fn break_line(&mut self) -> bool {
        if !self.insert('\n') {
            return false;
        }
        self.line_start = self.front;
        true
    }

    pub fn break_line_ahead(&mut self) -> bool {
        if !self.insert_ahead('\n') {
            return false;
        }
        self.line_end = self.back;
        true
    }

    // Deletion.

    pub fn erase_ahead(&mut self) -> bool {
        if self.back == self.line_end {
            return false;
        }
        self.back += 1;
        true
    }

    pub fn erase_behind(&mut self) -> bool {
        if self.front == self.line_start {
            return false;
        }
        self.front -= 1;
        true
    }

    pub fn erase_to_line_end(&mut self) {
        self.back = self.line_end;
    }

    pub fn erase_to_line_start(&mut self) {
        self.front = self.line_start;
    }

    /// Delete the line break that ends the current line.
    pub fn join_next(&mut self) -> bool {
        self.right_star();
        if self.back == self.end {
            return false;
        }
        self.back += 1;
        self.line_end = self.scan_line_end(self.back);
        true
    }

    /// Delete the line break that ends the previous line.
    pub fn join_previous(&mut self) -> bool {
        self.left_star();
        if self.front == self.start {
            return false;
        }
        self.front -= 1;
        self.line_start = self.scan_line_start(self.front);
        true
    }

    /// Delete the current line. On the last line the text goes but the
    /// command fails, as there is no terminator to remove.
    pub fn kill_line(&mut self) -> bool {
        self.front = self.line_start;
        self.back = self.line_end;
        if self.line_end == self.end {
            return false;
        }
        self.back += 1;
        self.line_end = self.scan_line_end(self.back);
        true
    }

    /// Move the character ahead across the point, mapping it through `f`.
    pub fn transfer_ahead(&mut self, f: impl Fn(char) -> char) -> bool {
        if self.back == self.line_end {
            return false;
        }
        let c = self.cells[self.back];
        self.back += 1;
        self.cells[self.front] = f(c);
        self.front += 1;
        true
    }

    /// Move the character behind across the point, mapping it through `f`.
    pub fn transfer_behind(&mut self, f: impl Fn(char) -> char) -> bool {
        if self.front == self.line_start {
            return false;
        }
        self.front -= 1;
        let c = self.cells[self.front];
        self.back -= 1;
        self.cells[self.back] = f(c);
        true
    }

    // Span operations used after a search. Positions come from the same line.

    pub(crate) fn discard_ahead_to(&mut self, index: usize) {
        self.back = index;
    }

    pub(crate) fn discard_behind_to(&mut self, index: usize) {
        self.front = index;
    }

    pub(crate) fn copy_ahead_to(&mut self, index: usize) {
        let n = index - self.back;
        self.cells.copy_within(self.back..index, self.front);
        self.front += n;
        self.back = index;
    }

    pub(crate) fn copy_behind_to(&mut self, index: usize) {
        let n = self.front - index;
        self.cells.copy_within(index..self.front, self.back - n);
        self.front = index;
        self.back -= n;
    }

    /// Swap in a secondary region carved out of the gap. The primary text
    /// stays where it is on either side.
    pub fn enter_secondary(&mut self, text: &str) -> Result<(), BufferFull> {
        if self.secondary {
            return Err(BufferFull);
        }
        let chars: Vec<char> = text.chars().filter(|&c| c != '\r').collect();
        if self.free() < chars.len() + 2 {
            return Err(BufferFull);
        }
        self.cells[self.front] = '\n';
        self.start = self.front + 1;
        self.end = self.back - 1;
        self.cells[self.end] = '\n';
        self.front = self.start;
        self.back = self.end;
        self.secondary = true;
        self.fill_back(&chars)
    }

    /// Drop the secondary region and return its text.
    pub fn leave_secondary(&mut self) -> Option<String> {
        if !self.secondary {
            return None;
        }
        let text = self.text();
        self.front = self.start - 1;
        self.back = self.end + 1;
        self.start = 1;
        self.end = self.cells.len() - 1;
        self.secondary = false;
        self.recompute_line_start();
        self.recompute_line_end();
        Some(text)
    }
}

impl fmt::Display for GapBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> GapBuffer {
        GapBuffer::with_text(64, text).unwrap()
    }

    #[test]
    fn load_then_text_round_trips() {
        let b = buf("one\ntwo\n");
        assert_eq!(b.text(), "one\ntwo\n");
        assert_eq!(b.point(), 0);
        assert_eq!(b.current_line(), "one");
    }

    #[test]
    fn load_drops_carriage_returns() {
        let b = buf("a\r\nb\r\n");
        assert_eq!(b.text(), "a\nb\n");
    }

    #[test]
    fn load_rejects_oversized_text() {
        assert_eq!(GapBuffer::with_text(4, "abcdef").unwrap_err(), BufferFull);
    }

    #[test]
    fn right_stops_at_line_end() {
        let mut b = buf("ab\ncd");
        assert!(b.right());
        assert!(b.right());
        assert!(!b.right());
        assert_eq!(b.text_before(), "ab");
        assert_eq!(b.text(), "ab\ncd");
    }

    #[test]
    fn move_down_and_up_cross_lines() {
        let mut b = buf("ab\ncd\nef");
        assert!(b.move_down());
        assert_eq!(b.current_line(), "cd");
        assert_eq!(b.text_before(), "ab\n");
        assert!(b.move_down());
        assert!(!b.move_down());
        assert_eq!(b.current_line(), "ef");
        assert_eq!(b.text_before(), "ab\ncd\nef");
        assert!(b.move_up());
        assert_eq!(b.current_line(), "cd");
        assert_eq!(b.text_before(), "ab\ncd");
        b.move_to_start();
        assert_eq!(b.point(), 0);
        b.move_to_end();
        assert_eq!(b.text_after(), "");
        assert_eq!(b.text(), "ab\ncd\nef");
    }

    #[test]
    fn insert_fails_when_gap_exhausted() {
        let mut b = GapBuffer::with_text(6, "abc").unwrap();
        assert_eq!(b.free(), 2);
        assert!(b.insert('x'));
        assert!(b.insert_ahead('y'));
        assert!(!b.insert('z'));
        assert!(!b.insert_ahead('z'));
        assert_eq!(b.text(), "xyabc");
    }

    #[test]
    fn kill_line_removes_terminator() {
        let mut b = buf("one\ntwo\nthree");
        b.right();
        assert!(b.kill_line());
        assert_eq!(b.text(), "two\nthree");
        assert_eq!(b.current_line(), "two");
        b.move_down();
        assert!(!b.kill_line());
        assert_eq!(b.text(), "two\n");
    }

    #[test]
    fn join_deletes_line_breaks() {
        let mut b = buf("ab\ncd\nef");
        assert!(b.join_next());
        assert_eq!(b.text(), "abcd\nef");
        assert_eq!(b.current_line(), "abcd");
        b.move_down();
        assert!(b.join_previous());
        assert_eq!(b.text(), "abcdef");
        assert!(!b.join_previous());
    }

    #[test]
    fn erase_and_break() {
        let mut b = buf("abcd");
        b.right();
        assert!(b.erase_ahead());
        assert!(b.erase_behind());
        assert!(!b.erase_behind());
        assert_eq!(b.text(), "cd");
        assert!(b.break_line());
        assert_eq!(b.text(), "\ncd");
        assert_eq!(b.current_line(), "cd");
        assert!(b.break_line_ahead());
        assert_eq!(b.current_line(), "");
        b.erase_to_line_end();
        assert_eq!(b.text(), "\n\ncd");
    }

    #[test]
    fn transfer_maps_characters() {
        let mut b = buf("ab");
        assert!(b.transfer_ahead(|c| c.to_ascii_uppercase()));
        assert_eq!(b.text(), "Ab");
        assert!(b.transfer_behind(|c| c.to_ascii_lowercase()));
        assert_eq!(b.text(), "ab");
    }

    #[test]
    fn secondary_region_swaps_in_and_out() {
        let mut b = buf("main\ntext");
        b.move_down();
        b.enter_secondary("side\nnote").unwrap();
        assert!(b.in_secondary());
        assert_eq!(b.text(), "side\nnote");
        assert_eq!(b.current_line(), "side");
        assert!(!b.move_up());
        b.move_to_end();
        assert!(b.insert('!'));
        assert_eq!(b.leave_secondary().as_deref(), Some("side\nnote!"));
        assert_eq!(b.text(), "main\ntext");
        assert_eq!(b.current_line(), "text");
        assert_eq!(b.point(), 5);
    }

    #[test]
    fn secondary_needs_room_in_gap() {
        let mut b = GapBuffer::with_text(8, "abcde").unwrap();
        assert_eq!(b.enter_secondary("xy"), Err(BufferFull));
        assert!(!b.in_secondary());
    }
}
