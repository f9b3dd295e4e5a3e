use crate::encryption::EncryptionError;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

impl PdfError {
    /// Byte offset of the malformed input, if this is a tokenizer failure
    pub fn offset(&self) -> Option<u64> {
        match self {
            PdfError::Parse(err) => err.offset(),
            _ => None,
        }
    }

    /// True when the caller may simply ask for another password
    pub fn is_bad_password(&self) -> bool {
        matches!(self, PdfError::Encryption(EncryptionError::BadPassword))
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
