//! Streaming encryption and decryption of object data
//!
//! [`EncryptingWriter`] encrypts stream contents while they are written and
//! [`StandardDecryption`] decrypts them chunk by chunk as they are read.
//! Both produce the same bytes as the one-shot transforms of
//! [`StandardSecurityHandler`] for the same key and IV.

use super::aes::{generate_iv, pkcs7_padding_len, CbcDecryptor, CbcEncryptor, BLOCK_SIZE};
use super::rc4::Rc4;
use super::{EncryptionError, EncryptionResult, StandardSecurityHandler};
use crate::objects::ObjectId;
use std::io::{self, Write};

enum WriteCipher {
    Rc4(Rc4),
    Aes(CbcEncryptor),
}

/// Writer that encrypts everything written to it for one object
///
/// AES output starts with the IV; the final padded block is only written
/// by [`finish`](EncryptingWriter::finish), so dropping the writer without
/// finishing leaves the output truncated.
pub struct EncryptingWriter<W: Write> {
    inner: W,
    cipher: WriteCipher,
    pending: Vec<u8>,
}

impl<W: Write> EncryptingWriter<W> {
    pub fn new(
        handler: &StandardSecurityHandler,
        id: ObjectId,
        inner: W,
    ) -> EncryptionResult<Self> {
        Self::with_iv(handler, id, inner, &generate_iv())
    }

    pub fn with_iv(
        handler: &StandardSecurityHandler,
        id: ObjectId,
        mut inner: W,
        iv: &[u8; BLOCK_SIZE],
    ) -> EncryptionResult<Self> {
        let key = handler.object_key(id);
        let cipher = if handler.algorithm().is_aes() {
            let encryptor = CbcEncryptor::new(&key, iv)?;
            inner.write_all(iv)?;
            WriteCipher::Aes(encryptor)
        } else {
            WriteCipher::Rc4(Rc4::new(&key))
        };

        Ok(Self {
            inner,
            cipher,
            pending: Vec::with_capacity(BLOCK_SIZE),
        })
    }

    /// Write the padding block (AES) and hand back the inner writer
    pub fn finish(mut self) -> EncryptionResult<W> {
        if let WriteCipher::Aes(encryptor) = &mut self.cipher {
            let pad = BLOCK_SIZE - self.pending.len();
            let mut block = [pad as u8; BLOCK_SIZE];
            block[..self.pending.len()].copy_from_slice(&self.pending);
            encryptor.encrypt_block(&mut block);
            self.inner.write_all(&block)?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.cipher {
            WriteCipher::Rc4(rc4) => {
                let output = rc4.process(buf);
                self.inner.write_all(&output)?;
            }
            WriteCipher::Aes(encryptor) => {
                self.pending.extend_from_slice(buf);
                let ready = self.pending.len() - self.pending.len() % BLOCK_SIZE;
                let mut output = Vec::with_capacity(ready);
                for chunk in self.pending[..ready].chunks_exact(BLOCK_SIZE) {
                    let mut block = [0u8; BLOCK_SIZE];
                    block.copy_from_slice(chunk);
                    encryptor.encrypt_block(&mut block);
                    output.extend_from_slice(&block);
                }
                self.pending.drain(..ready);
                self.inner.write_all(&output)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum ReadCipher {
    Rc4(Rc4),
    Aes {
        key: Vec<u8>,
        iv: Vec<u8>,
        decryptor: Option<CbcDecryptor>,
    },
}

/// Incremental decryption of one object's data
///
/// The last AES block is held back until [`finish`](StandardDecryption::finish)
/// because only then is it known to carry the padding.
pub struct StandardDecryption {
    cipher: ReadCipher,
    pending: Vec<u8>,
}

impl StandardDecryption {
    pub fn new(handler: &StandardSecurityHandler, id: ObjectId) -> Self {
        let key = handler.object_key(id);
        let cipher = if handler.algorithm().is_aes() {
            ReadCipher::Aes {
                key,
                iv: Vec::with_capacity(BLOCK_SIZE),
                decryptor: None,
            }
        } else {
            ReadCipher::Rc4(Rc4::new(&key))
        };
        Self {
            cipher,
            pending: Vec::new(),
        }
    }

    /// Feed the next chunk of ciphertext, returning the plaintext available so far
    pub fn update(&mut self, chunk: &[u8]) -> EncryptionResult<Vec<u8>> {
        let (iv, key, decryptor) = match &mut self.cipher {
            ReadCipher::Rc4(rc4) => return Ok(rc4.process(chunk)),
            ReadCipher::Aes { key, iv, decryptor } => (iv, key, decryptor),
        };

        let mut input = chunk;
        if decryptor.is_none() {
            let take = (BLOCK_SIZE - iv.len()).min(input.len());
            iv.extend_from_slice(&input[..take]);
            input = &input[take..];
            if iv.len() < BLOCK_SIZE {
                return Ok(Vec::new());
            }
            *decryptor = Some(CbcDecryptor::new(key, iv)?);
        }
        let Some(decryptor) = decryptor.as_mut() else {
            return Ok(Vec::new());
        };

        self.pending.extend_from_slice(input);
        let held = match self.pending.len() % BLOCK_SIZE {
            0 => self.pending.len().min(BLOCK_SIZE),
            partial => partial,
        };
        let ready = self.pending.len() - held;

        let mut output = Vec::with_capacity(ready);
        for chunk in self.pending[..ready].chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            decryptor.decrypt_block(&mut block);
            output.extend_from_slice(&block);
        }
        self.pending.drain(..ready);
        Ok(output)
    }

    /// Decrypt the held back block and strip its padding
    pub fn finish(self) -> EncryptionResult<Vec<u8>> {
        let mut decryptor = match self.cipher {
            ReadCipher::Rc4(_) => return Ok(Vec::new()),
            ReadCipher::Aes {
                decryptor: Some(decryptor),
                ..
            } => decryptor,
            ReadCipher::Aes { .. } => {
                return Err(EncryptionError::InvalidCiphertext(
                    "data shorter than the IV".to_string(),
                ))
            }
        };

        let Ok(mut block) = <[u8; BLOCK_SIZE]>::try_from(self.pending.as_slice()) else {
            return Err(EncryptionError::InvalidCiphertext(format!(
                "{} trailing bytes do not form the final block",
                self.pending.len()
            )));
        };
        decryptor.decrypt_block(&mut block);
        let pad = pkcs7_padding_len(&block)?;
        Ok(block[..BLOCK_SIZE - pad].to_vec())
    }
}
