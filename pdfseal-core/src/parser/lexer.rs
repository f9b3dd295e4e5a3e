//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2.
//!
//! The lexer keeps one reusable scratch buffer for the current token.
//! [`Lexer::value`] borrows that buffer and is only valid until the next
//! call to [`Lexer::next_token`]; use [`Lexer::token`] for an owned copy.

use super::source::{ByteSource, MemorySource};
use super::{MalformedKind, ParseError, ParseResult};
use crate::objects::ObjectId;
use std::sync::Arc;
use tracing::{trace, warn};

/// PDF Token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TokenKind {
    /// Integer or real number, kept as literal text
    Number,
    /// String (literal or hexadecimal), decoded
    String,
    /// Name object without the leading slash, `#xx` escapes decoded
    Name,
    /// Comment text after `%`
    Comment,
    /// Left square bracket [
    StartArray,
    /// Right square bracket ]
    EndArray,
    /// Dictionary start <<
    StartDict,
    /// Dictionary end >>
    EndDict,
    /// Indirect reference `N G R`, only from [`Lexer::next_valid_token`]
    Reference,
    /// Keywords and operators (`obj`, `R`, `true`, `BT`, ...)
    Other,
    /// End of file
    EndOfFile,
}

/// Owned copy of a lexed token
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded payload; one byte per character of the token text
    pub value: Vec<u8>,
    /// The string was written as `<...>`
    pub hex_string: bool,
    /// Set for [`TokenKind::Reference`] tokens
    pub reference: Option<ObjectId>,
    /// Byte offset where the token starts
    pub offset: u64,
}

impl Token {
    /// Token payload with every byte mapped to the char of the same value
    pub fn text(&self) -> String {
        latin1(&self.value)
    }

    /// Check for a keyword/operator token with the given text
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Other && self.value == keyword.as_bytes()
    }
}

/// PDF whitespace: NUL, TAB, LF, FF, CR and SPACE
pub fn is_whitespace(ch: u8) -> bool {
    is_whitespace_with(ch, true)
}

/// PDF whitespace, optionally excluding NUL
pub fn is_whitespace_with(ch: u8, nul_is_whitespace: bool) -> bool {
    match ch {
        0 => nul_is_whitespace,
        9 | 10 | 12 | 13 | 32 => true,
        _ => false,
    }
}

/// Whitespace or one of `( ) < > [ ] { } / %`
pub fn is_delimiter(ch: u8) -> bool {
    is_whitespace(ch)
        || matches!(
            ch,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
}

/// Value of an ASCII hex digit
pub fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<S> {
    source: S,
    kind: TokenKind,
    value: Vec<u8>,
    hex_string: bool,
    reference: Option<ObjectId>,
    token_start: u64,
}

impl Lexer<MemorySource> {
    /// Lexer over an in-memory buffer
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new(MemorySource::new(data))
    }
}

impl<S: ByteSource> Lexer<S> {
    /// Create a new lexer positioned at the source's cursor
    pub fn new(source: S) -> Self {
        Self {
            source,
            kind: TokenKind::EndOfFile,
            value: Vec::with_capacity(64),
            hex_string: false,
            reference: None,
            token_start: 0,
        }
    }

    /// Independent lexer over a duplicate of the same source
    pub fn duplicate(&self) -> ParseResult<Self> {
        Ok(Self::new(self.source.duplicate()?))
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn token_kind(&self) -> TokenKind {
        self.kind
    }

    /// Payload of the current token; overwritten by the next advance
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn text(&self) -> String {
        latin1(&self.value)
    }

    pub fn is_hex_string(&self) -> bool {
        self.hex_string
    }

    pub fn reference(&self) -> Option<ObjectId> {
        self.reference
    }

    /// Byte offset where the current token starts
    pub fn token_offset(&self) -> u64 {
        self.token_start
    }

    /// The current token as an integer, if it is one
    pub fn int_value(&self) -> Option<i64> {
        if self.kind != TokenKind::Number {
            return None;
        }
        std::str::from_utf8(&self.value).ok()?.parse().ok()
    }

    /// Owned copy of the current token
    pub fn token(&self) -> Token {
        Token {
            kind: self.kind,
            value: self.value.clone(),
            hex_string: self.hex_string,
            reference: self.reference,
            offset: self.token_start,
        }
    }

    /// Get current position
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    pub fn len(&self) -> u64 {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Move the cursor; positions past the end of the source are rejected
    pub fn seek(&mut self, pos: u64) -> ParseResult<()> {
        if pos > self.source.len() {
            return Err(ParseError::Malformed {
                offset: pos,
                kind: MalformedKind::PositionOutOfRange(pos),
            });
        }
        self.source.seek(pos)?;
        Ok(())
    }

    /// Push back a byte that was read one step too far
    pub fn back_one_position(&mut self, ch: u8) {
        self.source.unread(ch);
    }

    pub fn read_byte(&mut self) -> ParseResult<Option<u8>> {
        Ok(self.source.read_byte()?)
    }

    /// Read up to `size` raw bytes
    pub fn read_string(&mut self, size: usize) -> ParseResult<Vec<u8>> {
        let mut buf = vec![0u8; size];
        let read = self.source.read_fully(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Iterator over the remaining tokens, comments skipped and references folded
    pub fn tokens(&mut self) -> Tokens<'_, S> {
        Tokens {
            lexer: self,
            done: false,
        }
    }

    fn malformed(&self, kind: MalformedKind) -> ParseError {
        ParseError::Malformed {
            offset: self.token_start,
            kind,
        }
    }

    /// Get the next token
    ///
    /// Returns `false` (and sets [`TokenKind::EndOfFile`]) when the source is
    /// exhausted. On success the cursor sits right after the token.
    pub fn next_token(&mut self) -> ParseResult<bool> {
        self.value.clear();
        self.hex_string = false;
        self.reference = None;

        let ch = loop {
            match self.source.read_byte()? {
                Some(ch) if is_whitespace(ch) => continue,
                other => break other,
            }
        };
        self.token_start = self.source.position();
        let Some(ch) = ch else {
            self.kind = TokenKind::EndOfFile;
            return Ok(false);
        };
        self.token_start -= 1;

        match ch {
            b'[' => self.kind = TokenKind::StartArray,
            b']' => self.kind = TokenKind::EndArray,
            b'/' => self.read_name()?,
            b'>' => {
                if self.source.read_byte()? != Some(b'>') {
                    return Err(self.malformed(MalformedKind::UnexpectedGreaterThan));
                }
                self.kind = TokenKind::EndDict;
            }
            b'<' => self.read_angle_bracket()?,
            b'%' => self.read_comment()?,
            b'(' => self.read_literal_string()?,
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.read_number(ch)?,
            _ => self.read_other(ch)?,
        }

        trace!(kind = ?self.kind, offset = self.token_start, "token");
        Ok(true)
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> ParseResult<()> {
        self.kind = TokenKind::Name;
        while let Some(ch) = self.source.read_byte()? {
            if is_delimiter(ch) {
                self.source.unread(ch);
                break;
            }
            if ch == b'#' {
                let mark = self.source.position();
                if let Some(decoded) = self.read_name_escape()? {
                    self.value.push(decoded);
                    continue;
                }
                warn!(
                    offset = mark - 1,
                    "'#' in name is not followed by two hex digits"
                );
                self.source.seek(mark)?;
            }
            self.value.push(ch);
        }
        Ok(())
    }

    fn read_name_escape(&mut self) -> ParseResult<Option<u8>> {
        let high = self.source.read_byte()?.and_then(hex_value);
        let Some(high) = high else {
            return Ok(None);
        };
        let low = self.source.read_byte()?.and_then(hex_value);
        Ok(low.map(|low| (high << 4) | low))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<()> {
        let mut next = self.source.read_byte()?;
        if next == Some(b'<') {
            self.kind = TokenKind::StartDict;
            return Ok(());
        }

        self.kind = TokenKind::String;
        self.hex_string = true;
        let mut pending: Option<u8> = None;
        loop {
            match next {
                None => return Err(self.malformed(MalformedKind::UnterminatedHexString)),
                Some(b'>') => break,
                Some(ch) if is_whitespace(ch) => {}
                Some(ch) => {
                    let nibble = hex_value(ch)
                        .ok_or_else(|| self.malformed(MalformedKind::InvalidHexDigit(ch)))?;
                    match pending.take() {
                        Some(high) => self.value.push((high << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
            }
            next = self.source.read_byte()?;
        }

        // Odd digit count: the missing last nibble is zero
        if let Some(high) = pending {
            self.value.push(high << 4);
        }
        Ok(())
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> ParseResult<()> {
        self.kind = TokenKind::Comment;
        while let Some(ch) = self.source.read_byte()? {
            if ch == b'\r' || ch == b'\n' {
                self.source.unread(ch);
                break;
            }
            self.value.push(ch);
        }
        Ok(())
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<()> {
        self.kind = TokenKind::String;
        let mut nesting = 0usize;

        loop {
            let mut ch = self
                .source
                .read_byte()?
                .ok_or_else(|| self.malformed(MalformedKind::UnterminatedString))?;

            match ch {
                b'(' => nesting += 1,
                b')' => {
                    if nesting == 0 {
                        break;
                    }
                    nesting -= 1;
                }
                b'\\' => {
                    let escaped = self
                        .source
                        .read_byte()?
                        .ok_or_else(|| self.malformed(MalformedKind::UnterminatedString))?;
                    ch = match escaped {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'b' => 0x08,
                        b'f' => 0x0C,
                        // Line continuation: backslash + EOL produces nothing
                        b'\r' => {
                            self.skip_line_feed()?;
                            continue;
                        }
                        b'\n' => continue,
                        b'0'..=b'7' => self.read_octal(escaped)?,
                        other => other,
                    };
                }
                b'\r' => {
                    // Bare CR and CRLF both become LF
                    match self.source.read_byte()? {
                        None => return Err(self.malformed(MalformedKind::UnterminatedString)),
                        Some(b'\n') => {}
                        Some(other) => self.source.unread(other),
                    }
                    ch = b'\n';
                }
                _ => {}
            }
            self.value.push(ch);
        }
        Ok(())
    }

    /// Up to three octal digits, the first already read
    fn read_octal(&mut self, first: u8) -> ParseResult<u8> {
        let mut value = u32::from(first - b'0');
        for _ in 0..2 {
            match self.source.read_byte()? {
                Some(digit @ b'0'..=b'7') => value = (value << 3) + u32::from(digit - b'0'),
                Some(other) => {
                    self.source.unread(other);
                    break;
                }
                None => break,
            }
        }
        Ok((value & 0xFF) as u8)
    }

    fn skip_line_feed(&mut self) -> ParseResult<()> {
        match self.source.read_byte()? {
            Some(b'\n') | None => {}
            Some(other) => self.source.unread(other),
        }
        Ok(())
    }

    /// Read a number, kept as text
    ///
    /// Acrobat reads integers written with several leading minus signs
    /// (`--5`) as zero, so such tokens get the text `0`.
    fn read_number(&mut self, first: u8) -> ParseResult<()> {
        self.kind = TokenKind::Number;
        let mut is_real = false;
        let mut minus_count = 0usize;
        let mut next;

        if first == b'-' {
            next = Some(first);
            while next == Some(b'-') {
                minus_count += 1;
                next = self.source.read_byte()?;
            }
            self.value.push(b'-');
        } else {
            if first != b'+' {
                self.value.push(first);
            }
            is_real = first == b'.';
            next = self.source.read_byte()?;
        }

        while let Some(ch) = next {
            if !(ch.is_ascii_digit() || ch == b'.') {
                break;
            }
            is_real |= ch == b'.';
            self.value.push(ch);
            next = self.source.read_byte()?;
        }

        if minus_count > 1 && !is_real {
            self.value.clear();
            self.value.push(b'0');
        }
        if let Some(ch) = next {
            self.source.unread(ch);
        }
        Ok(())
    }

    /// Read a keyword or operator up to the next delimiter
    fn read_other(&mut self, first: u8) -> ParseResult<()> {
        self.kind = TokenKind::Other;
        self.value.push(first);
        while let Some(ch) = self.source.read_byte()? {
            if is_delimiter(ch) {
                self.source.unread(ch);
                break;
            }
            self.value.push(ch);
        }
        Ok(())
    }

    /// Next token with comments skipped and `N G R` folded into a reference
    ///
    /// Up to two tokens are read speculatively. When the pattern does not
    /// complete, the cursor is put back right after the first number and
    /// that number is the current token.
    pub fn next_valid_token(&mut self) -> ParseResult<bool> {
        let mut first: Option<Token> = None;
        let mut resume_at = 0u64;
        let mut second: Vec<u8> = Vec::new();

        while self.next_token()? {
            if self.kind == TokenKind::Comment {
                continue;
            }
            match (&first, second.is_empty()) {
                (None, _) => {
                    if self.kind != TokenKind::Number {
                        return Ok(true);
                    }
                    first = Some(self.token());
                    resume_at = self.source.position();
                }
                (Some(_), true) => {
                    if self.kind != TokenKind::Number || self.value.is_empty() {
                        break;
                    }
                    second = self.value.clone();
                }
                (Some(number), false) => {
                    if self.kind == TokenKind::Other && self.value == b"R" {
                        if let Some(id) = parse_reference(&number.value, &second) {
                            self.kind = TokenKind::Reference;
                            self.reference = Some(id);
                            self.value.clear();
                            self.value.extend_from_slice(id.to_string().as_bytes());
                            self.token_start = number.offset;
                            return Ok(true);
                        }
                    }
                    break;
                }
            }
        }

        match first {
            Some(number) => {
                self.source.seek(resume_at)?;
                self.kind = TokenKind::Number;
                self.value = number.value;
                self.hex_string = false;
                self.reference = None;
                self.token_start = number.offset;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read one line into `buf` for low-level structure scanning (xref rows)
    ///
    /// Leading whitespace is skipped (NUL only when `nul_is_whitespace`).
    /// Bytes are copied up to CR, LF, CRLF or end of data; the rest of an
    /// overlong line is discarded. When room remains, `" X"` is appended after
    /// the line so that numeric scanning of short lines never runs off the
    /// end. Returns the number of line bytes copied, or `None` when nothing
    /// could be read at all.
    pub fn read_line_segment(
        &mut self,
        buf: &mut [u8],
        nul_is_whitespace: bool,
    ) -> ParseResult<Option<usize>> {
        let len = buf.len();
        let mut ptr = 0;
        let mut ch = None;

        if ptr < len {
            ch = loop {
                match self.source.read_byte()? {
                    Some(b) if is_whitespace_with(b, nul_is_whitespace) => continue,
                    other => break other,
                }
            };
        }

        while ptr < len {
            match ch {
                None | Some(b'\n') => break,
                Some(b'\r') => {
                    self.skip_line_feed()?;
                    break;
                }
                Some(b) => {
                    buf[ptr] = b;
                    ptr += 1;
                }
            }
            if ptr >= len {
                break;
            }
            ch = self.source.read_byte()?;
        }

        if ptr >= len {
            loop {
                ch = self.source.read_byte()?;
                match ch {
                    None | Some(b'\n') => break,
                    Some(b'\r') => {
                        self.skip_line_feed()?;
                        break;
                    }
                    Some(_) => {}
                }
            }
        }

        if ch.is_none() && ptr == 0 {
            return Ok(None);
        }
        if ptr + 2 <= len {
            buf[ptr] = b' ';
            buf[ptr + 1] = b'X';
        }
        Ok(Some(ptr))
    }
}

fn parse_reference(number: &[u8], generation: &[u8]) -> Option<ObjectId> {
    let number = std::str::from_utf8(number).ok()?.parse::<u32>().ok()?;
    let generation = std::str::from_utf8(generation).ok()?.parse::<u16>().ok()?;
    Some(ObjectId::new(number, generation))
}

/// Iterator returned by [`Lexer::tokens`]
pub struct Tokens<'a, S> {
    lexer: &'a mut Lexer<S>,
    done: bool,
}

impl<S: ByteSource> Iterator for Tokens<'_, S> {
    type Item = ParseResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.lexer.next_valid_token() {
            Ok(true) => Some(Ok(self.lexer.token())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &[u8]) -> Lexer<MemorySource> {
        Lexer::from_bytes(input)
    }

    fn next(lexer: &mut Lexer<MemorySource>) -> (TokenKind, Vec<u8>) {
        lexer.next_token().unwrap();
        (lexer.token_kind(), lexer.value().to_vec())
    }

    #[test]
    fn test_lexer_basic_tokens() {
        let mut lexer = lex(b"123 -456 3.14 true false null /Name");

        assert_eq!(next(&mut lexer), (TokenKind::Number, b"123".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"-456".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"3.14".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"true".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"false".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"null".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"Name".to_vec()));
        assert!(!lexer.next_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::EndOfFile);
    }

    #[test]
    fn test_lexer_empty_and_whitespace_only() {
        assert!(!lex(b"").next_token().unwrap());
        let mut lexer = lex(b" \t\r\n\x0C\x00 ");
        assert!(!lexer.next_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::EndOfFile);
    }

    #[test]
    fn test_lexer_dictionaries_and_arrays() {
        let mut lexer = lex(b"<</Type/Page/Kids[1 2]>>");

        assert_eq!(lexer.next_token().unwrap(), true);
        assert_eq!(lexer.token_kind(), TokenKind::StartDict);
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"Type".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"Page".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"Kids".to_vec()));
        assert_eq!(next(&mut lexer).0, TokenKind::StartArray);
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"1".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"2".to_vec()));
        assert_eq!(next(&mut lexer).0, TokenKind::EndArray);
        assert_eq!(next(&mut lexer).0, TokenKind::EndDict);
    }

    #[test]
    fn test_lexer_lone_greater_than_is_error() {
        let mut lexer = lex(b"  > x");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.offset(), Some(2));
        assert_eq!(
            err.malformed_kind(),
            Some(&MalformedKind::UnexpectedGreaterThan)
        );
    }

    #[test]
    fn test_lexer_names_with_hex_escapes() {
        let mut lexer = lex(b"/A#20B /Lime#20Green /#41#42(x)");
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"A B".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"Lime Green".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"AB".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::String, b"x".to_vec()));
    }

    #[test]
    fn test_lexer_name_with_bad_escape_copies_through() {
        let mut lexer = lex(b"/A#ZZ /B#4 /C#");
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"A#ZZ".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"B#4".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"C#".to_vec()));
        assert!(!lexer.next_token().unwrap());
    }

    #[test]
    fn test_lexer_empty_name() {
        let mut lexer = lex(b"/ /X");
        assert_eq!(next(&mut lexer), (TokenKind::Name, Vec::new()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"X".to_vec()));
    }

    #[test]
    fn test_lexer_hexadecimal_strings() {
        let mut lexer = lex(b"<41424344> <48 65\n6C 6C 6F> <>");

        assert_eq!(next(&mut lexer), (TokenKind::String, b"ABCD".to_vec()));
        assert!(lexer.is_hex_string());
        assert_eq!(next(&mut lexer), (TokenKind::String, b"Hello".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::String, Vec::new()));
        assert!(lexer.is_hex_string());
    }

    #[test]
    fn test_lexer_hexadecimal_strings_odd_length() {
        let mut lexer = lex(b"<414> <ABC> <1>");
        assert_eq!(next(&mut lexer).1, vec![0x41, 0x40]);
        assert_eq!(next(&mut lexer).1, vec![0xAB, 0xC0]);
        assert_eq!(next(&mut lexer).1, vec![0x10]);
    }

    #[test]
    fn test_lexer_hex_string_errors() {
        let err = lex(b"<41G2>").next_token().unwrap_err();
        assert_eq!(
            err.malformed_kind(),
            Some(&MalformedKind::InvalidHexDigit(b'G'))
        );

        let mut lexer = lex(b"x <4142");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(
            err.malformed_kind(),
            Some(&MalformedKind::UnterminatedHexString)
        );
        assert_eq!(err.offset(), Some(2));
    }

    #[test]
    fn test_lexer_literal_string_escapes() {
        let mut lexer = lex(b"(a\\nb\\rc\\td\\be\\ff\\(\\)\\\\)");
        assert_eq!(
            next(&mut lexer).1,
            b"a\nb\rc\td\x08e\x0Cf()\\".to_vec()
        );
        assert!(!lexer.is_hex_string());
    }

    #[test]
    fn test_lexer_literal_string_nested_parens() {
        let mut lexer = lex(b"(Nested (parentheses) work) (())");
        assert_eq!(
            next(&mut lexer).1,
            b"Nested (parentheses) work".to_vec()
        );
        assert_eq!(next(&mut lexer).1, b"()".to_vec());
    }

    #[test]
    fn test_lexer_literal_string_octal() {
        let mut lexer = lex(b"(\\101\\102) (\\1x) (\\0053) (\\777)");
        assert_eq!(next(&mut lexer).1, b"AB".to_vec());
        assert_eq!(next(&mut lexer).1, vec![0x01, b'x']);
        assert_eq!(next(&mut lexer).1, vec![0x05, b'3']);
        assert_eq!(next(&mut lexer).1, vec![0xFF]);
    }

    #[test]
    fn test_lexer_literal_string_line_continuation() {
        let mut lexer = lex(b"(ab\\\ncd\\\r\nef\\\rgh)");
        assert_eq!(next(&mut lexer).1, b"abcdefgh".to_vec());
    }

    #[test]
    fn test_lexer_literal_string_end_of_line_normalization() {
        let mut lexer = lex(b"(a\rb\r\nc\nd)");
        assert_eq!(next(&mut lexer).1, b"a\nb\nc\nd".to_vec());
    }

    #[test]
    fn test_lexer_literal_string_unknown_escape_keeps_byte() {
        let mut lexer = lex(b"(\\q)");
        assert_eq!(next(&mut lexer).1, b"q".to_vec());
    }

    #[test]
    fn test_lexer_unterminated_literal_string() {
        for input in [&b"(abc"[..], b"(abc\\", b"(a(b)", b"(a\r"] {
            let err = lex(input).next_token().unwrap_err();
            assert_eq!(
                err.malformed_kind(),
                Some(&MalformedKind::UnterminatedString),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_lexer_comments() {
        let mut lexer = lex(b"%PDF-1.7\r\n123");
        assert_eq!(next(&mut lexer), (TokenKind::Comment, b"PDF-1.7".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"123".to_vec()));
    }

    #[test]
    fn test_lexer_numbers() {
        let mut lexer = lex(b"+17 -.002 .5 4. 0 -0 1.2.3");
        assert_eq!(next(&mut lexer).1, b"17".to_vec());
        assert_eq!(next(&mut lexer).1, b"-.002".to_vec());
        assert_eq!(next(&mut lexer).1, b".5".to_vec());
        assert_eq!(next(&mut lexer).1, b"4.".to_vec());
        assert_eq!(next(&mut lexer).1, b"0".to_vec());
        assert_eq!(next(&mut lexer).1, b"-0".to_vec());
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"1.2.3".to_vec()));
    }

    #[test]
    fn test_lexer_numbers_with_several_minus_signs() {
        let mut lexer = lex(b"--5 ---12 --5.5 --");
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"0".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"0".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"-5.5".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"0".to_vec()));
    }

    #[test]
    fn test_lexer_number_stops_at_non_digit() {
        let mut lexer = lex(b"12abc");
        assert_eq!(next(&mut lexer), (TokenKind::Number, b"12".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"abc".to_vec()));
    }

    #[test]
    fn test_lexer_keywords_stop_at_delimiters() {
        let mut lexer = lex(b"obj<<endobj%c\nBT{}");
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"obj".to_vec()));
        assert_eq!(next(&mut lexer).0, TokenKind::StartDict);
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"endobj".to_vec()));
        assert_eq!(next(&mut lexer).0, TokenKind::Comment);
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"BT".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"{".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Other, b"}".to_vec()));
    }

    #[test]
    fn test_lexer_token_positions() {
        let mut lexer = lex(b"  /Type 12");
        lexer.next_token().unwrap();
        assert_eq!(lexer.token_offset(), 2);
        assert_eq!(lexer.position(), 7);
        lexer.next_token().unwrap();
        assert_eq!(lexer.token_offset(), 8);
        assert_eq!(lexer.int_value(), Some(12));
    }

    #[test]
    fn test_next_valid_token_folds_reference() {
        let mut lexer = lex(b"12 0 R");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Reference);
        assert_eq!(lexer.reference(), Some(ObjectId::new(12, 0)));
        assert_eq!(lexer.token_offset(), 0);
        assert!(!lexer.next_valid_token().unwrap());
    }

    #[test]
    fn test_next_valid_token_rewinds_after_first_number() {
        let mut lexer = lex(b"12 0 Q");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Number);
        assert_eq!(lexer.value(), b"12");
        assert_eq!(lexer.position(), 2);

        assert!(lexer.next_token().unwrap());
        assert_eq!(lexer.value(), b"0");
        assert!(lexer.next_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Other);
        assert_eq!(lexer.value(), b"Q");
    }

    #[test]
    fn test_next_valid_token_skips_comments() {
        let mut lexer = lex(b"%c\n5 %x\n 1 %y\n R /N");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.reference(), Some(ObjectId::new(5, 1)));
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Name);
    }

    #[test]
    fn test_next_valid_token_number_then_non_number() {
        let mut lexer = lex(b"3 /Name");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.value(), b"3");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Name);
        assert_eq!(lexer.value(), b"Name");
    }

    #[test]
    fn test_next_valid_token_at_end_of_data() {
        let mut lexer = lex(b"7 8");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.value(), b"7");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.value(), b"8");
        assert!(!lexer.next_valid_token().unwrap());
    }

    #[test]
    fn test_next_valid_token_does_not_fold_reals_or_negatives() {
        let mut lexer = lex(b"1.5 0 R");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Number);
        assert_eq!(lexer.value(), b"1.5");

        let mut lexer = lex(b"-1 0 R");
        assert!(lexer.next_valid_token().unwrap());
        assert_eq!(lexer.token_kind(), TokenKind::Number);
    }

    #[test]
    fn test_tokens_iterator() {
        let mut lexer = lex(b"[1 0 R 2] %done");
        let kinds: Vec<_> = lexer
            .tokens()
            .map(|token| token.unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StartArray,
                TokenKind::Reference,
                TokenKind::Number,
                TokenKind::EndArray
            ]
        );
    }

    #[test]
    fn test_tokens_iterator_stops_after_error() {
        let mut lexer = lex(b"1 (open");
        let results: Vec<_> = lexer.tokens().collect();
        // The reference lookahead after `1` hits the unterminated string
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(
            err.malformed_kind(),
            Some(&MalformedKind::UnterminatedString)
        );
    }

    #[test]
    fn test_read_line_segment() {
        let mut lexer = lex(b"\n\n0000000000 65535 f\r\n0000000017 00000 n\rlast");
        let mut buf = [0u8; 24];

        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(18));
        assert_eq!(&buf[..20], b"0000000000 65535 f X");
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(18));
        assert_eq!(&buf[..18], b"0000000017 00000 n");
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(4));
        assert_eq!(&buf[..6], b"last X");
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), None);
    }

    #[test]
    fn test_read_line_segment_truncates_long_lines() {
        let mut lexer = lex(b"abcdefgh\nnext");
        let mut buf = [0u8; 4];
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(4));
        assert_eq!(&buf, b"next");
    }

    #[test]
    fn test_read_line_segment_nul_handling() {
        let mut buf = [0u8; 8];
        let mut lexer = lex(b"\x00ab\n");
        assert_eq!(lexer.read_line_segment(&mut buf, true).unwrap(), Some(2));
        assert_eq!(&buf[..2], b"ab");

        let mut lexer = lex(b"\x00ab\n");
        assert_eq!(lexer.read_line_segment(&mut buf, false).unwrap(), Some(3));
        assert_eq!(&buf[..3], b"\x00ab");
    }

    #[test]
    fn test_seek_beyond_length_is_error() {
        let mut lexer = lex(b"abc");
        assert!(lexer.seek(3).is_ok());
        let err = lexer.seek(4).unwrap_err();
        assert_eq!(
            err.malformed_kind(),
            Some(&MalformedKind::PositionOutOfRange(4))
        );
    }

    #[test]
    fn test_duplicate_lexer_is_independent() {
        let mut lexer = lex(b"/A /B /C");
        lexer.next_token().unwrap();
        let mut copy = lexer.duplicate().unwrap();

        assert_eq!(next(&mut copy), (TokenKind::Name, b"B".to_vec()));
        assert_eq!(next(&mut copy), (TokenKind::Name, b"C".to_vec()));
        assert_eq!(next(&mut lexer), (TokenKind::Name, b"B".to_vec()));
    }

    #[test]
    fn test_character_classes() {
        for ch in [0u8, 9, 10, 12, 13, 32] {
            assert!(is_whitespace(ch));
            assert!(is_delimiter(ch));
        }
        assert!(!is_whitespace_with(0, false));
        assert!(is_whitespace_with(32, false));
        for ch in b"()<>[]{}/%" {
            assert!(is_delimiter(*ch));
        }
        assert!(!is_delimiter(b'a'));
        assert!(!is_delimiter(b'#'));
        assert_eq!(hex_value(b'f'), Some(15));
        assert_eq!(hex_value(b'A'), Some(10));
        assert_eq!(hex_value(b'g'), None);
    }

    #[test]
    fn test_token_text_is_one_char_per_byte() {
        let mut lexer = lex(b"<E9FF>");
        lexer.next_token().unwrap();
        let token = lexer.token();
        assert_eq!(token.text(), "\u{e9}\u{ff}");
        assert_eq!(token.text().chars().count(), 2);
    }
}
