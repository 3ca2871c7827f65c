//! Argument helpers for the `ecce` binary.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::EcceError;

/// Room left for growth when sizing the buffer from the input file.
const HEADROOM: u64 = 256 * 1024;

/// Buffer size when the input length cannot be known in advance.
pub const DEFAULT_CAPACITY: usize = 2 * 1024 * 1024;

/// Parse a `-size` argument: a byte count with an optional `K` or `M` suffix.
pub fn parse_size(arg: &str) -> Result<usize, EcceError> {
    let re = Regex::new(r"^(\d+)([kKmM]?)$").map_err(|e| EcceError::Usage(e.to_string()))?;
    let caps = re
        .captures(arg)
        .ok_or_else(|| EcceError::Usage(format!("bad size parameter '{arg}' (expected n, nK or nM)")))?;
    let n: usize = caps[1]
        .parse()
        .map_err(|_| EcceError::Usage(format!("bad size parameter '{arg}'")))?;
    let unit = match &caps[2] {
        "k" | "K" => 1024,
        "m" | "M" => 1024 * 1024,
        _ => 1,
    };
    n.checked_mul(unit)
        .filter(|&size| size > 0)
        .ok_or_else(|| EcceError::Usage(format!("bad size parameter '{arg}'")))
}

/// Decode a `-hex-command` argument: pairs of hex digits, one byte each.
pub fn decode_hex(arg: &str) -> Result<String, EcceError> {
    if arg.len() % 2 != 0 {
        return Err(EcceError::Usage(
            "hex-command parameter corrupt (odd number of characters)".to_string(),
        ));
    }
    let mut bytes = Vec::with_capacity(arg.len() / 2);
    for pair in arg.as_bytes().chunks(2) {
        let digits = std::str::from_utf8(pair).map_err(|_| EcceError::Encoding)?;
        let byte = u8::from_str_radix(digits, 16)
            .ok()
            .filter(|_| pair.iter().all(u8::is_ascii_hexdigit))
            .ok_or_else(|| {
                EcceError::Usage(format!("hex-command parameter corrupt - '{digits}' is not hex"))
            })?;
        bytes.push(byte);
    }
    String::from_utf8(bytes).map_err(|_| EcceError::Encoding)
}

/// Buffer capacity for a text of `len` bytes: three times its length plus headroom.
pub fn capacity_for(len: u64) -> usize {
    let cells = len.saturating_add(HEADROOM).saturating_mul(3);
    usize::try_from(cells).unwrap_or(usize::MAX)
}

/// Buffer capacity for editing `path`.
pub fn estimate_capacity(path: &Path) -> usize {
    match fs::metadata(path) {
        Ok(m) if m.is_file() => capacity_for(m.len()),
        _ => DEFAULT_CAPACITY,
    }
}
