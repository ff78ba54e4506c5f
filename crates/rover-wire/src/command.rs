//! Command token codec
//!
//! A command is exactly five bytes, `CMD:` followed by a direction letter,
//! with no terminator.

use rover_core::{Direction, COMMAND_PREFIX, COMMAND_TOKEN_LEN};

/// Encode a direction as its command token
pub fn encode_command(direction: Direction) -> [u8; COMMAND_TOKEN_LEN] {
    let mut token = [0u8; COMMAND_TOKEN_LEN];
    token[..COMMAND_PREFIX.len()].copy_from_slice(COMMAND_PREFIX.as_bytes());
    // Direction letters are ASCII
    token[COMMAND_PREFIX.len()] = direction.letter() as u8;
    token
}

/// Parse a single command token
///
/// Surrounding whitespace and NUL padding are ignored. Anything other than
/// a well-formed token yields `None`.
pub fn parse_command(token: &str) -> Option<Direction> {
    let token = token.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    let letter = token.strip_prefix(COMMAND_PREFIX)?;
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Direction::from_letter(c),
        _ => None,
    }
}

/// Scan a received chunk for command tokens, in order
///
/// One read normally carries exactly one token, but TCP may coalesce
/// several writes into one read. Every `CMD:<letter>` occurrence is
/// reported; unknown letters are skipped.
pub fn scan_commands(chunk: &str) -> impl Iterator<Item = Direction> + '_ {
    chunk
        .match_indices(COMMAND_PREFIX)
        .filter_map(move |(idx, _)| {
            chunk[idx + COMMAND_PREFIX.len()..]
                .chars()
                .next()
                .and_then(Direction::from_letter)
        })
}
