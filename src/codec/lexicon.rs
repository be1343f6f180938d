//! Static lexicon for dictionary substitution.
//!
//! A fixed, ordered list of short byte strings that show up in structured
//! storage payloads: protocol keywords, JSON punctuation and keys, log levels
//! and common numeric literals. A Lexicon token stores only the index, so the
//! table order is part of the wire format and must never change.
//!
//! Entries of three bytes or fewer are never emitted (the token itself costs
//! three bytes) but remain valid decode targets.

/// Lexicon entries, indexed by the Lexicon token's index byte.
pub static LEXICON: &[&[u8]] = &[
    // JSON structure
    b"{\"",
    b"\"}",
    b"\":\"",
    b"\",\"",
    b"\": \"",
    b"\", \"",
    b"\":[",
    b"],\"",
    b"\":{",
    b"},{\"",
    b"null",
    b"true",
    b"false",
    // JSON keys
    b"\"id\":",
    b"\"type\":",
    b"\"name\":",
    b"\"value\":",
    b"\"values\":[",
    b"\"data\":",
    b"\"status\":",
    b"\"error\":",
    b"\"result\":",
    b"\"count\":",
    b"\"level\":",
    b"\"msg\":",
    b"\"message\":",
    b"\"timestamp\":",
    b"\"sensor\":",
    b"\"shape\":[",
    b"\"dtype\":",
    // Protocol keywords
    b"HTTP/1.1",
    b"HTTP/2",
    b"GET ",
    b"POST ",
    b"PUT ",
    b"DELETE ",
    b"Host: ",
    b"Accept: ",
    b"User-Agent: ",
    b"Connection: ",
    b"keep-alive",
    b"Content-Type: ",
    b"Content-Length: ",
    b"application/json",
    b"application/octet-stream",
    b"text/plain",
    b"http://",
    b"https://",
    b"localhost",
    b"127.0.0.1",
    b"\r\n\r\n",
    b"<?xml version=\"1.0\"",
    b" encoding=\"UTF-8\"?>",
    // Log levels
    b"ERROR",
    b"WARN",
    b"INFO",
    b"DEBUG",
    b"TRACE",
    b"[ERROR]",
    b"[WARN]",
    b"[INFO]",
    b"[DEBUG]",
    // Numeric literals
    b"0.000000",
    b"1.000000",
    b"0.0000",
    b"0.5000",
    b"1.0000",
    b"-1.0000",
    b"100.00",
    b"0x00000000",
    b"0xFFFFFFFF",
    b"0xffffffff",
    b"00000000",
    b"FFFFFFFF",
    b"ffffffff",
    b"1000",
    b"-1.0",
    b"NaN",
    b"Infinity",
    b"-Infinity",
    b"1970-01-01T00:00:00",
    b"T00:00:00Z",
    b":00.000Z",
];

/// Number of lexicon entries.
pub fn len() -> usize {
    LEXICON.len()
}

/// Entry at `index`, if any.
pub fn entry(index: u8) -> Option<&'static [u8]> {
    LEXICON.get(index as usize).copied()
}

/// Cheap filter on the first byte before scanning the table.
pub fn is_plausible_lead(byte: u8) -> bool {
    matches!(
        byte,
        b'{' | b'}'
            | b'"'
            | b']'
            | b'n'
            | b't'
            | b'f'
            | b'H'
            | b'G'
            | b'P'
            | b'D'
            | b'A'
            | b'U'
            | b'C'
            | b'I'
            | b'k'
            | b'a'
            | b'h'
            | b'l'
            | b'1'
            | b'\r'
            | b'<'
            | b' '
            | b'E'
            | b'W'
            | b'T'
            | b'['
            | b'0'
            | b'-'
            | b'F'
            | b'N'
            | b':'
    )
}
