//! AES-CBC helpers for PDF encryption
//!
//! Keys of 16 bytes select AES-128, keys of 32 bytes AES-256. Strings and
//! streams use PKCS#7 padding; key wrapping (`/OE`, `/UE`, `/Perms`) and the
//! revision 6 hash use unpadded CBC with whole blocks.

use super::{EncryptionError, EncryptionResult};
use aes::cipher::block_padding::{NoPadding, Padding, Pkcs7};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use rand::RngCore;

/// AES block size in bytes; also the IV length
pub const BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fresh random initialization vector
pub fn generate_iv() -> [u8; BLOCK_SIZE] {
    let mut iv = [0u8; BLOCK_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

fn invalid_key(len: usize) -> EncryptionError {
    EncryptionError::UnsupportedConfiguration(format!("AES key of {len} bytes"))
}

fn check_block_aligned(data: &[u8]) -> EncryptionResult<()> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(EncryptionError::InvalidCiphertext(format!(
            "{} bytes is not a whole number of AES blocks",
            data.len()
        )));
    }
    Ok(())
}

fn encrypt_with<C, P>(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>>
where
    C: KeyIvInit + BlockEncryptMut,
    P: Padding<C::BlockSize>,
{
    let cipher = C::new_from_slices(key, iv).map_err(|_| invalid_key(key.len()))?;
    let mut buf = vec![0u8; data.len() + BLOCK_SIZE];
    buf[..data.len()].copy_from_slice(data);
    let len = cipher
        .encrypt_padded_mut::<P>(&mut buf, data.len())
        .map_err(|_| {
            EncryptionError::InvalidCiphertext(format!(
                "{} bytes cannot be encrypted without padding",
                data.len()
            ))
        })?
        .len();
    buf.truncate(len);
    Ok(buf)
}

fn decrypt_with<C, P>(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>>
where
    C: KeyIvInit + BlockDecryptMut,
    P: Padding<C::BlockSize>,
{
    let cipher = C::new_from_slices(key, iv).map_err(|_| invalid_key(key.len()))?;
    let mut buf = data.to_vec();
    let len = cipher
        .decrypt_padded_mut::<P>(&mut buf)
        .map_err(|_| EncryptionError::InvalidCiphertext("invalid PKCS#7 padding".to_string()))?
        .len();
    buf.truncate(len);
    Ok(buf)
}

/// CBC encryption with PKCS#7 padding; output excludes the IV
pub fn encrypt_cbc(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>> {
    match key.len() {
        16 => encrypt_with::<Aes128CbcEnc, Pkcs7>(key, iv, data),
        32 => encrypt_with::<Aes256CbcEnc, Pkcs7>(key, iv, data),
        n => Err(invalid_key(n)),
    }
}

/// CBC decryption, removing and checking PKCS#7 padding
pub fn decrypt_cbc(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>> {
    check_block_aligned(data)?;
    match key.len() {
        16 => decrypt_with::<Aes128CbcDec, Pkcs7>(key, iv, data),
        32 => decrypt_with::<Aes256CbcDec, Pkcs7>(key, iv, data),
        n => Err(invalid_key(n)),
    }
}

/// CBC encryption of whole blocks without padding
pub fn encrypt_cbc_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>> {
    check_block_aligned(data)?;
    match key.len() {
        16 => encrypt_with::<Aes128CbcEnc, NoPadding>(key, iv, data),
        32 => encrypt_with::<Aes256CbcEnc, NoPadding>(key, iv, data),
        n => Err(invalid_key(n)),
    }
}

/// CBC decryption of whole blocks without padding
pub fn decrypt_cbc_no_padding(key: &[u8], iv: &[u8], data: &[u8]) -> EncryptionResult<Vec<u8>> {
    check_block_aligned(data)?;
    match key.len() {
        16 => decrypt_with::<Aes128CbcDec, NoPadding>(key, iv, data),
        32 => decrypt_with::<Aes256CbcDec, NoPadding>(key, iv, data),
        n => Err(invalid_key(n)),
    }
}

/// Block-at-a-time CBC encryption for streaming writers
pub(crate) enum CbcEncryptor {
    Aes128(Aes128CbcEnc),
    Aes256(Aes256CbcEnc),
}

impl CbcEncryptor {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> EncryptionResult<Self> {
        let cipher = match key.len() {
            16 => Self::Aes128(
                Aes128CbcEnc::new_from_slices(key, iv).map_err(|_| invalid_key(16))?,
            ),
            32 => Self::Aes256(
                Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| invalid_key(32))?,
            ),
            n => return Err(invalid_key(n)),
        };
        Ok(cipher)
    }

    /// Encrypt one 16-byte block in place
    pub(crate) fn encrypt_block(&mut self, block: &mut [u8; BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block_mut(block),
            Self::Aes256(cipher) => cipher.encrypt_block_mut(block),
        }
    }
}

/// Block-at-a-time CBC decryption for incremental readers
pub(crate) enum CbcDecryptor {
    Aes128(Aes128CbcDec),
    Aes256(Aes256CbcDec),
}

impl CbcDecryptor {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> EncryptionResult<Self> {
        let cipher = match key.len() {
            16 => Self::Aes128(
                Aes128CbcDec::new_from_slices(key, iv).map_err(|_| invalid_key(16))?,
            ),
            32 => Self::Aes256(
                Aes256CbcDec::new_from_slices(key, iv).map_err(|_| invalid_key(32))?,
            ),
            n => return Err(invalid_key(n)),
        };
        Ok(cipher)
    }

    /// Decrypt one 16-byte block in place
    pub(crate) fn decrypt_block(&mut self, block: &mut [u8; BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block_mut(block),
            Self::Aes256(cipher) => cipher.decrypt_block_mut(block),
        }
    }
}

/// Length of PKCS#7 padding at the end of a decrypted final block
pub(crate) fn pkcs7_padding_len(block: &[u8; BLOCK_SIZE]) -> EncryptionResult<usize> {
    let pad = usize::from(block[BLOCK_SIZE - 1]);
    if pad == 0
        || pad > BLOCK_SIZE
        || block[BLOCK_SIZE - pad..]
            .iter()
            .any(|&b| usize::from(b) != pad)
    {
        return Err(EncryptionError::InvalidCiphertext(
            "invalid PKCS#7 padding".to_string(),
        ));
    }
    Ok(pad)
}
