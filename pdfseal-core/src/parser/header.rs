//! PDF Header Parser
//!
//! Locates the file header (ISO 32000-1 Section 7.5.2) and the trailing
//! `startxref` keyword (Section 7.5.5). Both searches are lenient: the header
//! may be preceded by up to a kilobyte of junk and `startxref` may be followed
//! by arbitrary trailing bytes.

use super::lexer::{Lexer, TokenKind};
use super::source::ByteSource;
use super::{MalformedKind, ParseError, ParseResult};
use tracing::debug;

/// How far into the file a header is searched for
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Size of each backwards step when looking for `startxref`
const STARTXREF_WINDOW: u64 = 1024;

const STARTXREF: &[u8] = b"startxref";

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// PDF 1.0 through 2.0
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Parse `major.minor` from the bytes following the magic
    fn parse(bytes: &[u8]) -> Option<Self> {
        let text: String = bytes
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|&b| b as char)
            .collect();
        let (major, minor) = text.split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PdfHeader {
    /// Offset of the `%` of the magic; all file offsets are relative to it
    pub offset: u64,
    pub version: PdfVersion,
    /// A comment line with at least four bytes >= 128 follows the header
    pub has_binary_marker: bool,
}

impl<S: ByteSource> Lexer<S> {
    /// Find `%PDF-` within the first kilobyte and read the version after it
    pub fn check_pdf_header(&mut self) -> ParseResult<PdfHeader> {
        self.find_header(b"%PDF-")
    }

    /// Same as [`Lexer::check_pdf_header`] for FDF files
    pub fn check_fdf_header(&mut self) -> ParseResult<PdfHeader> {
        self.find_header(b"%FDF-")
    }

    fn find_header(&mut self, magic: &[u8]) -> ParseResult<PdfHeader> {
        let not_found = || ParseError::Malformed {
            offset: 0,
            kind: MalformedKind::HeaderNotFound,
        };

        self.seek(0)?;
        let window = self.read_string(HEADER_SEARCH_WINDOW)?;
        let offset = find_bytes(&window, magic).ok_or_else(not_found)?;

        let after_magic = &window[offset + magic.len()..];
        let version = PdfVersion::parse(after_magic).ok_or_else(not_found)?;

        self.seek((offset + magic.len()) as u64)?;
        let mut line = [0u8; 64];
        self.read_line_segment(&mut line, true)?;
        let has_binary_marker = self.check_binary_marker()?;

        debug!(offset, %version, has_binary_marker, "found file header");
        Ok(PdfHeader {
            offset: offset as u64,
            version,
            has_binary_marker,
        })
    }

    fn check_binary_marker(&mut self) -> ParseResult<bool> {
        let mut line = [0u8; 1024];
        let Some(len) = self.read_line_segment(&mut line, true)? else {
            return Ok(false);
        };
        let line = &line[..len];
        if line.first() != Some(&b'%') {
            return Ok(false);
        }
        Ok(line[1..].iter().filter(|&&b| b >= 128).count() >= 4)
    }

    /// Offset of the last `startxref` keyword in the file
    ///
    /// The tail is scanned backwards in kilobyte windows that overlap by the
    /// keyword length, so a keyword straddling two windows is still found.
    pub fn find_startxref(&mut self) -> ParseResult<u64> {
        let len = self.len();
        let step = STARTXREF_WINDOW - STARTXREF.len() as u64;
        let mut pos = len.saturating_sub(STARTXREF_WINDOW);

        loop {
            self.seek(pos)?;
            let window = self.read_string(STARTXREF_WINDOW as usize)?;
            if let Some(index) = rfind_bytes(&window, STARTXREF) {
                let found = pos + index as u64;
                debug!(offset = found, "found startxref");
                return Ok(found);
            }
            if pos == 0 {
                break;
            }
            pos = pos.saturating_sub(step);
        }

        Err(ParseError::Malformed {
            offset: len,
            kind: MalformedKind::StartxrefNotFound,
        })
    }

    /// Cross-reference offset stored after the last `startxref`
    pub fn read_startxref(&mut self) -> ParseResult<u64> {
        let keyword = self.find_startxref()?;
        self.seek(keyword)?;
        self.next_token()?;
        self.next_token()?;

        let found = self.text();
        match self.int_value() {
            Some(value) if value >= 0 => Ok(value as u64),
            _ => Err(ParseError::UnexpectedToken {
                offset: self.token_offset(),
                expected: "cross-reference offset".to_string(),
                found: if self.token_kind() == TokenKind::EndOfFile {
                    "end of file".to_string()
                } else {
                    found
                },
            }),
        }
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
