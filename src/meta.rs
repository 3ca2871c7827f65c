//! `%` commands: session control that never runs as part of a program.

use ecce_core::{is_terminator, CaseMode, Scanner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meta {
    Case(CaseMode),
    Version,
    /// `%W`: write the file and carry on.
    Write,
    /// `%C`: write the file and finish.
    Close,
    /// `%A`: finish without writing.
    Abort,
    Switch(Switch),
}

/// Target of a `%S` context switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Switch {
    /// Back to the main text, or into slot `0` from the main text.
    Toggle,
    Slot(char),
    /// Load a file into a secondary context saved under `slot`.
    File { slot: char, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    #[error("Letter for %")]
    LetterFor,
    #[error("Percent {0}")]
    Unknown(char),
    #[error("%S {0}")]
    Slot(char),
    #[error("%S? {0}")]
    AfterSlot(char),
}

/// Parse the command after a `%`, consuming the rest of its statement.
pub fn parse(sc: &mut Scanner) -> Result<Meta, MetaError> {
    let result = parse_letter(sc);
    if result.is_err() {
        sc.skip_statement();
    }
    result
}

fn parse_letter(sc: &mut Scanner) -> Result<Meta, MetaError> {
    let c = sc.sym();
    if is_terminator(c) {
        sc.unread(c);
        return Err(MetaError::LetterFor);
    }
    let meta = match c.to_ascii_uppercase() {
        'L' => Meta::Case(CaseMode::Lower),
        'U' => Meta::Case(CaseMode::Upper),
        'N' => Meta::Case(CaseMode::Normal),
        'E' => Meta::Case(CaseMode::Either),
        'V' => Meta::Version,
        'W' => Meta::Write,
        'C' => Meta::Close,
        'A' => Meta::Abort,
        'S' => return parse_switch(sc).map(Meta::Switch),
        c if c.is_ascii_alphabetic() => return Err(MetaError::Unknown(c.to_ascii_lowercase())),
        _ => return Err(MetaError::LetterFor),
    };
    sc.skip_statement();
    Ok(meta)
}

fn parse_switch(sc: &mut Scanner) -> Result<Switch, MetaError> {
    let c = sc.raw();
    if is_terminator(c) {
        return Ok(Switch::Toggle);
    }
    let (slot, mut file) = match c {
        '=' => ('0', true),
        '!' => ('?', false),
        d if d.is_ascii_digit() => (d, false),
        other => return Err(MetaError::Slot(other)),
    };
    if !file {
        let t = sc.raw();
        if t == '=' {
            file = true;
        } else if !is_terminator(t) {
            return Err(MetaError::AfterSlot(t));
        }
    }
    if file {
        let path = sc.rest_of_line().trim().to_string();
        return Ok(Switch::File { slot, path });
    }
    Ok(Switch::Slot(slot))
}
