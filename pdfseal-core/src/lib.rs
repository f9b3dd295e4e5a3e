//! # pdfseal
//!
//! Byte-level PDF reading and the standard security handler, in pure Rust.
//!
//! ## Features
//!
//! - **Tokenizer**: the full PDF lexical grammar (ISO 32000-1 Section 7.2) over
//!   any seekable byte source, with indirect reference folding and byte offsets
//!   on every error
//! - **File structure**: `%PDF-` header and `startxref` scanning
//! - **Direct objects**: numbers, strings, names, arrays and dictionaries read
//!   straight from the token stream
//! - **Encryption**: RC4 40/128-bit, AES-128 and AES-256 (revisions 2 to 6),
//!   key setup for new documents and password validation for existing ones
//! - **Streaming transforms**: encrypt while writing, decrypt chunk by chunk
//!
//! ## Quick Start
//!
//! ### Tokenizing
//!
//! ```rust
//! use pdfseal::parser::{Lexer, TokenKind};
//!
//! # fn main() -> pdfseal::Result<()> {
//! let mut lexer = Lexer::from_bytes(b"<< /Type /Catalog /Pages 2 0 R >>".as_slice());
//! let kinds = lexer
//!     .tokens()
//!     .map(|token| token.map(|t| t.kind))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! assert_eq!(kinds[0], TokenKind::StartDict);
//! assert_eq!(kinds[4], TokenKind::Reference);
//! # Ok(())
//! # }
//! ```
//!
//! ### Encrypting
//!
//! ```rust
//! use pdfseal::encryption::{
//!     EncryptionAlgorithm, EncryptionConfig, Permissions, StandardSecurityHandler,
//! };
//! use pdfseal::objects::ObjectId;
//!
//! # fn main() -> pdfseal::Result<()> {
//! let config = EncryptionConfig::new(EncryptionAlgorithm::Aes128)
//!     .user_password("reader")
//!     .owner_password("author")
//!     .permissions(Permissions::PRINT);
//! let handler = StandardSecurityHandler::setup(&config, b"document id 0001")?;
//!
//! let id = ObjectId::new(5, 0);
//! let encrypted = handler.encrypt_stream(id, b"BT (Hello) Tj ET")?;
//!
//! // A reader only has the /Encrypt dictionary, the document id and a password
//! let dict = handler.encryption_dictionary();
//! let reader = StandardSecurityHandler::read_key(&dict, b"document id 0001", b"reader")?;
//! assert!(!reader.is_owner_password());
//! assert_eq!(reader.decrypt_stream(id, &encrypted)?, b"BT (Hello) Tj ET");
//! # Ok(())
//! # }
//! ```

pub mod encryption;
pub mod error;
pub mod objects;
pub mod parser;

pub use encryption::{
    EncryptionAlgorithm, EncryptionConfig, EncryptionError, Permissions, StandardSecurityHandler,
};
pub use error::{PdfError, Result};
pub use objects::{Dictionary, Object, ObjectId};
pub use parser::{Lexer, ParseError, PdfVersion, Token, TokenKind};

/// Current version of pdfseal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
