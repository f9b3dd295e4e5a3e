//! PDF encryption support according to ISO 32000-1 Chapter 7.6
//!
//! This module implements the standard security handler: RC4 40-bit and
//! 128-bit, AES-128 and AES-256 (revisions 2 through 6), key setup for new
//! documents, password validation for existing ones, and the per-object
//! transforms applied to strings and streams.

mod aes;
mod document_id;
mod encryption_dict;
mod object_encryption;
mod permissions;
mod rc4;
mod standard_security;

pub use self::aes::{decrypt_cbc, encrypt_cbc, generate_iv, BLOCK_SIZE as AES_BLOCK_SIZE};
pub use self::document_id::{file_id_array, DocumentIdGenerator};
pub use self::encryption_dict::{
    CryptFilter, CryptFilterMethod, EncryptionDictionary, STANDARD_CRYPT_FILTER,
};
pub use self::object_encryption::{EncryptingWriter, StandardDecryption};
pub use self::permissions::Permissions;
pub use self::rc4::{rc4, Rc4};
pub use self::standard_security::{
    Aes256Revision, EncryptionAlgorithm, EncryptionConfig, StandardSecurityHandler,
    PASSWORD_PADDING,
};

use thiserror::Error;

/// Result type for encryption operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;

/// Encryption errors
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// Neither the owner nor the user password matched
    #[error("Bad user or owner password")]
    BadPassword,

    #[error("Unsupported encryption configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Encryption dictionary has no /{0} entry")]
    MissingEntry(&'static str),

    #[error("Malformed encryption dictionary: {0}")]
    MalformedDictionary(String),

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EncryptionError {
    /// Only a bad password can be fixed by asking again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EncryptionError::BadPassword)
    }
}
