//! Symbol classes for command input.

bitflags::bitflags! {
    /// What a command-line character means to the compiler.
    ///
    /// Command letters carry the arguments they accept (`SIGN`, `SCOPE`,
    /// `TEXT`, `REPEAT`); punctuation is marked `EXT` plus its own kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolClass: u32 {
        const REPEAT      = 1 << 0;
        const TEXT        = 1 << 1;
        const SCOPE       = 1 << 2;
        const SIGN        = 1 << 3;
        const DELIMITER   = 1 << 4;
        const NUMBER      = 1 << 5;
        const EXT         = 1 << 6;
        const INVALID     = 1 << 7;
        const DIGIT       = 1 << 8;
        const PERCENT     = 1 << 9;
        const GROUP_OPEN  = 1 << 10;
        const COMMA       = 1 << 11;
        const GROUP_CLOSE = 1 << 12;
        const PLUS        = 1 << 13;
        const MINUS       = 1 << 14;
        const BANG        = 1 << 15;
        const STAR        = 1 << 16;
        const TERMINATOR  = 1 << 17;
    }
}

use SymbolClass as S;

const fn letter(c: u8) -> SymbolClass {
    match c {
        b'A' | b'H' => S::SCOPE,
        b'B' | b'C' | b'E' | b'G' | b'J' | b'K' | b'L' | b'M' | b'P' | b'R' => {
            S::SIGN.union(S::REPEAT)
        }
        b'D' | b'F' | b'T' | b'U' => S::SIGN.union(S::SCOPE).union(S::TEXT).union(S::REPEAT),
        b'I' => S::SIGN.union(S::TEXT).union(S::REPEAT),
        b'S' | b'V' => S::SIGN.union(S::TEXT),
        b'N' => S::empty(),
        _ => S::INVALID,
    }
}

const fn class_of(c: u8) -> SymbolClass {
    match c {
        0..=31 | b';' => S::EXT.union(S::TERMINATOR),
        b'0'..=b'9' => S::EXT.union(S::NUMBER).union(S::DIGIT),
        b'*' => S::EXT.union(S::NUMBER).union(S::STAR),
        b'!' => S::EXT.union(S::NUMBER).union(S::BANG),
        b'(' | b'<' | b'[' | b'{' => S::EXT.union(S::GROUP_OPEN),
        b')' | b'>' | b']' | b'}' => S::EXT.union(S::GROUP_CLOSE),
        b',' => S::EXT.union(S::COMMA),
        b'+' => S::EXT.union(S::PLUS),
        b'-' | b'^' | b'~' => S::EXT.union(S::MINUS),
        b'%' => S::EXT.union(S::PERCENT),
        b'"' | b'\'' | b'.' | b'/' | b':' | b'=' | b'_' | 127 => S::DELIMITER,
        b'?' | b'\\' => S::empty(),
        b'A'..=b'Z' => letter(c),
        b'a'..=b'z' => letter(c - (b'a' - b'A')),
        _ => S::INVALID,
    }
}

static TABLE: [SymbolClass; 256] = {
    let mut table = [S::INVALID; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = class_of(i as u8);
        i += 1;
    }
    table
};

/// Classify one input character. Anything outside 0..=255 is invalid.
pub fn classify(c: char) -> SymbolClass {
    match u8::try_from(u32::from(c)) {
        Ok(b) => TABLE[b as usize],
        Err(_) => S::INVALID,
    }
}

pub fn is_terminator(c: char) -> bool {
    classify(c).contains(S::TERMINATOR)
}
