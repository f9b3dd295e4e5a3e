//! Standard Security Handler according to ISO 32000-1 Section 7.6.3
//! and ISO 32000-2 Section 7.6.4.3
//!
//! Legacy revisions (2 to 4) derive the file key from the padded user
//! password with MD5 and RC4. Revisions 5 and 6 wrap a random 32-byte file
//! key under SHA-2 based password hashes.

use super::aes::{
    decrypt_cbc, decrypt_cbc_no_padding, encrypt_cbc, encrypt_cbc_no_padding, generate_iv,
    BLOCK_SIZE,
};
use super::encryption_dict::{
    CryptFilter, CryptFilterMethod, EncryptionDictionary, STANDARD_CRYPT_FILTER,
};
use super::rc4::rc4;
use super::{EncryptionError, EncryptionResult, Permissions};
use crate::objects::ObjectId;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Padding appended to passwords shorter than 32 bytes
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Appended to the key hash when metadata stays in clear (revision 4)
const METADATA_MARKER: [u8; 4] = [0xFF; 4];

/// Appended to the object key input for AES-128
const AES_SALT: &[u8] = b"sAlT";

/// Signature at bytes 9..12 of the decrypted `/Perms` block
const PERMS_SIGNATURE: &[u8] = b"adb";

const MAX_AES256_PASSWORD: usize = 127;
const ZERO_IV: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];
const SALT_LEN: usize = 8;
const HASH_LEN: usize = 32;

/// Encryption algorithm of the standard security handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// RC4 with a 40-bit key (revision 2)
    Rc4Bits40,
    /// RC4 with a 128-bit key (revisions 3 and 4)
    Rc4Bits128,
    /// AES-128 CBC (revision 4)
    Aes128,
    /// AES-256 CBC (revisions 5 and 6)
    Aes256,
}

impl EncryptionAlgorithm {
    /// Default file key length in bytes
    pub fn key_length(self) -> usize {
        match self {
            EncryptionAlgorithm::Rc4Bits40 => 5,
            EncryptionAlgorithm::Rc4Bits128 | EncryptionAlgorithm::Aes128 => 16,
            EncryptionAlgorithm::Aes256 => 32,
        }
    }

    pub fn is_aes(self) -> bool {
        matches!(
            self,
            EncryptionAlgorithm::Aes128 | EncryptionAlgorithm::Aes256
        )
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncryptionAlgorithm::Rc4Bits40 => "rc4-40",
            EncryptionAlgorithm::Rc4Bits128 => "rc4-128",
            EncryptionAlgorithm::Aes128 => "aes-128",
            EncryptionAlgorithm::Aes256 => "aes-256",
        };
        f.write_str(name)
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rc4-40" => Ok(EncryptionAlgorithm::Rc4Bits40),
            "rc4-128" => Ok(EncryptionAlgorithm::Rc4Bits128),
            "aes-128" => Ok(EncryptionAlgorithm::Aes128),
            "aes-256" => Ok(EncryptionAlgorithm::Aes256),
            other => Err(EncryptionError::UnsupportedConfiguration(format!(
                "unknown algorithm '{other}'"
            ))),
        }
    }
}

/// Revision written for AES-256
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aes256Revision {
    /// Single SHA-256 password hash
    #[default]
    R5,
    /// Iterated SHA-256/384/512 password hash (ISO 32000-2)
    R6,
}

/// Settings for encrypting a new document
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    pub algorithm: EncryptionAlgorithm,
    pub user_password: Vec<u8>,
    /// Replaced by random bytes when empty
    pub owner_password: Vec<u8>,
    pub permissions: Permissions,
    pub encrypt_metadata: bool,
    pub aes256_revision: Aes256Revision,
}

impl EncryptionConfig {
    pub fn new(algorithm: EncryptionAlgorithm) -> Self {
        Self {
            algorithm,
            user_password: Vec::new(),
            owner_password: Vec::new(),
            permissions: Permissions::empty(),
            encrypt_metadata: true,
            aes256_revision: Aes256Revision::default(),
        }
    }

    pub fn algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn user_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.user_password = password.as_ref().to_vec();
        self
    }

    pub fn owner_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.owner_password = password.as_ref().to_vec();
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }

    pub fn aes256_revision(mut self, revision: Aes256Revision) -> Self {
        self.aes256_revision = revision;
        self
    }
}

/// Key material and settings of one encrypted document
///
/// Built once per document, either from passwords when writing
/// ([`StandardSecurityHandler::setup`]) or from an `/Encrypt` dictionary
/// when reading ([`StandardSecurityHandler::read_key`]). Per-object keys
/// are derived on every call.
#[derive(Clone)]
pub struct StandardSecurityHandler {
    algorithm: EncryptionAlgorithm,
    revision: i64,
    key: Vec<u8>,
    owner_key: Vec<u8>,
    user_key: Vec<u8>,
    oe_key: Vec<u8>,
    ue_key: Vec<u8>,
    perms: Vec<u8>,
    document_id: Vec<u8>,
    permissions: Permissions,
    encrypt_metadata: bool,
    owner_password_used: bool,
}

impl StandardSecurityHandler {
    /// Derive all keys for a new document
    pub fn setup(config: &EncryptionConfig, document_id: &[u8]) -> EncryptionResult<Self> {
        let algorithm = config.algorithm;
        let permissions = config.permissions.normalized(algorithm);
        let owner_password = if config.owner_password.is_empty() {
            random_owner_password()
        } else {
            config.owner_password.clone()
        };

        let handler = match algorithm {
            EncryptionAlgorithm::Aes256 => {
                Self::setup_aes256(config, &owner_password, permissions, document_id)?
            }
            _ => Self::setup_legacy(config, &owner_password, permissions, document_id),
        };

        debug!(
            %algorithm,
            revision = handler.revision,
            key_length = handler.key.len(),
            "Encryption keys set up"
        );
        Ok(handler)
    }

    fn setup_legacy(
        config: &EncryptionConfig,
        owner_password: &[u8],
        permissions: Permissions,
        document_id: &[u8],
    ) -> Self {
        let algorithm = config.algorithm;
        // Revision 2 and 3 always encrypt metadata
        let encrypt_metadata =
            config.encrypt_metadata || algorithm == EncryptionAlgorithm::Rc4Bits40;
        let revision = match algorithm {
            EncryptionAlgorithm::Rc4Bits40 => 2,
            EncryptionAlgorithm::Rc4Bits128 if encrypt_metadata => 3,
            _ => 4,
        };
        let key_length = algorithm.key_length();

        let user_pad = pad_password(&config.user_password);
        let owner_pad = pad_password(owner_password);
        let owner_key = compute_owner_key(&user_pad, &owner_pad, revision, key_length);
        let key = compute_file_key(
            &user_pad,
            &owner_key,
            permissions,
            document_id,
            revision,
            key_length,
            encrypt_metadata,
        );
        let user_key = compute_user_key(&key, document_id, revision);

        Self {
            algorithm,
            revision,
            key,
            owner_key,
            user_key,
            oe_key: Vec::new(),
            ue_key: Vec::new(),
            perms: Vec::new(),
            document_id: document_id.to_vec(),
            permissions,
            encrypt_metadata,
            owner_password_used: true,
        }
    }

    fn setup_aes256(
        config: &EncryptionConfig,
        owner_password: &[u8],
        permissions: Permissions,
        document_id: &[u8],
    ) -> EncryptionResult<Self> {
        let revision = match config.aes256_revision {
            Aes256Revision::R5 => 5,
            Aes256Revision::R6 => 6,
        };
        let mut rng = rand::thread_rng();
        let mut key = vec![0u8; 32];
        rng.fill_bytes(&mut key);
        let mut salts = [0u8; 4 * SALT_LEN];
        rng.fill_bytes(&mut salts);
        let (user_salts, owner_salts) = salts.split_at(2 * SALT_LEN);
        let (validation_salt, key_salt) = user_salts.split_at(SALT_LEN);

        let user_password = truncate_aes256_password(&config.user_password);
        let mut user_key = hash_password(revision, user_password, validation_salt, &[])?;
        user_key.extend_from_slice(user_salts);
        let ue_key = encrypt_cbc_no_padding(
            &hash_password(revision, user_password, key_salt, &[])?,
            &ZERO_IV,
            &key,
        )?;

        let (validation_salt, key_salt) = owner_salts.split_at(SALT_LEN);
        let owner_password = truncate_aes256_password(owner_password);
        let mut owner_key = hash_password(revision, owner_password, validation_salt, &user_key)?;
        owner_key.extend_from_slice(owner_salts);
        let oe_key = encrypt_cbc_no_padding(
            &hash_password(revision, owner_password, key_salt, &user_key)?,
            &ZERO_IV,
            &key,
        )?;

        let mut block = [0u8; BLOCK_SIZE];
        block[..4].copy_from_slice(&permissions.bits().to_le_bytes());
        block[4..8].copy_from_slice(&METADATA_MARKER);
        block[8] = if config.encrypt_metadata { b'T' } else { b'F' };
        block[9..12].copy_from_slice(PERMS_SIGNATURE);
        rng.fill_bytes(&mut block[12..]);
        let perms = encrypt_cbc_no_padding(&key, &ZERO_IV, &block)?;

        Ok(Self {
            algorithm: EncryptionAlgorithm::Aes256,
            revision,
            key,
            owner_key,
            user_key,
            oe_key,
            ue_key,
            perms,
            document_id: document_id.to_vec(),
            permissions,
            encrypt_metadata: config.encrypt_metadata,
            owner_password_used: true,
        })
    }

    /// Build a handler around an already known file key
    ///
    /// No password entries exist, so [`encryption_dictionary`] output from
    /// such a handler has empty `/O` and `/U` strings.
    ///
    /// Holding the file key gives full access, so [`is_owner_password`]
    /// reports `true` until [`with_owner_access`] says otherwise.
    ///
    /// [`encryption_dictionary`]: StandardSecurityHandler::encryption_dictionary
    /// [`is_owner_password`]: StandardSecurityHandler::is_owner_password
    /// [`with_owner_access`]: StandardSecurityHandler::with_owner_access
    pub fn setup_by_encryption_key(
        key: &[u8],
        algorithm: EncryptionAlgorithm,
    ) -> EncryptionResult<Self> {
        let valid = match algorithm {
            EncryptionAlgorithm::Rc4Bits128 => (5..=16).contains(&key.len()),
            _ => key.len() == algorithm.key_length(),
        };
        if !valid {
            return Err(EncryptionError::UnsupportedConfiguration(format!(
                "{}-byte key for {algorithm}",
                key.len()
            )));
        }

        let revision = match algorithm {
            EncryptionAlgorithm::Rc4Bits40 => 2,
            EncryptionAlgorithm::Rc4Bits128 => 3,
            EncryptionAlgorithm::Aes128 => 4,
            EncryptionAlgorithm::Aes256 => 5,
        };

        Ok(Self {
            algorithm,
            revision,
            key: key.to_vec(),
            owner_key: Vec::new(),
            user_key: Vec::new(),
            oe_key: Vec::new(),
            ue_key: Vec::new(),
            perms: Vec::new(),
            document_id: Vec::new(),
            permissions: Permissions::empty().normalized(algorithm),
            encrypt_metadata: true,
            owner_password_used: true,
        })
    }

    /// Set the owner flag of a handler built from a raw key, e.g. when the
    /// caller obtained that key through the user password
    pub fn with_owner_access(mut self, owner: bool) -> Self {
        self.owner_password_used = owner;
        self
    }

    /// Validate `password` against an `/Encrypt` dictionary and recover the file key
    ///
    /// The password is tried as owner password first, then as user
    /// password. Neither matching is [`EncryptionError::BadPassword`].
    pub fn read_key(
        dict: &EncryptionDictionary,
        document_id: &[u8],
        password: &[u8],
    ) -> EncryptionResult<Self> {
        let (algorithm, key_length) = dict.algorithm()?;

        let mut handler = Self {
            algorithm,
            revision: dict.r,
            key: Vec::new(),
            owner_key: dict.o.clone(),
            user_key: dict.u.clone(),
            oe_key: dict.oe.clone().unwrap_or_default(),
            ue_key: dict.ue.clone().unwrap_or_default(),
            perms: dict.perms.clone().unwrap_or_default(),
            document_id: document_id.to_vec(),
            permissions: dict.p,
            encrypt_metadata: dict.encrypt_metadata,
            owner_password_used: false,
        };

        match algorithm {
            EncryptionAlgorithm::Aes256 => handler.read_aes256_key(password)?,
            _ => handler.read_legacy_key(password, key_length)?,
        }

        debug!(
            %algorithm,
            revision = handler.revision,
            key_length = handler.key.len(),
            owner = handler.owner_password_used,
            "Encryption key recovered"
        );
        Ok(handler)
    }

    fn read_legacy_key(&mut self, password: &[u8], key_length: usize) -> EncryptionResult<()> {
        let user_pad = self.user_pad_from_owner(&pad_password(password), key_length);
        if let Some(key) = self.check_user_pad(&user_pad, key_length) {
            self.key = key;
            self.owner_password_used = true;
            return Ok(());
        }

        if let Some(key) = self.check_user_pad(&pad_password(password), key_length) {
            self.key = key;
            self.owner_password_used = false;
            return Ok(());
        }

        Err(EncryptionError::BadPassword)
    }

    /// File key for `user_pad` if it reproduces the stored `/U`
    fn check_user_pad(&self, user_pad: &[u8], key_length: usize) -> Option<Vec<u8>> {
        let key = compute_file_key(
            user_pad,
            &self.owner_key,
            self.permissions,
            &self.document_id,
            self.revision,
            key_length,
            self.encrypt_metadata,
        );
        let user_key = compute_user_key(&key, &self.document_id, self.revision);

        // Revision 3 and later only define the first 16 bytes
        let checked = if self.revision >= 3 { 16 } else { 32 };
        (user_key.get(..checked)? == self.user_key.get(..checked)?).then_some(key)
    }

    /// Undo the owner key obfuscation, giving the padded user password
    fn user_pad_from_owner(&self, owner_pad: &[u8; 32], key_length: usize) -> Vec<u8> {
        let digest = owner_digest(owner_pad, self.revision, key_length);
        if self.revision == 2 {
            return rc4(&digest, &self.owner_key);
        }

        let mut user_pad = self.owner_key.clone();
        for round in (0..20u8).rev() {
            user_pad = rc4(&xor_key(&digest, round), &user_pad);
        }
        user_pad
    }

    fn read_aes256_key(&mut self, password: &[u8]) -> EncryptionResult<()> {
        let password = truncate_aes256_password(password);
        let malformed =
            |entry: &str| EncryptionError::MalformedDictionary(format!("/{entry} too short"));
        let owner = self.owner_key.get(..48).ok_or_else(|| malformed("O"))?;
        let user = self.user_key.get(..48).ok_or_else(|| malformed("U"))?;
        let revision = self.revision;

        let (owner_password_used, wrapped, intermediate) =
            if hash_password(revision, password, &owner[32..40], user)? == owner[..HASH_LEN] {
                let hash = hash_password(revision, password, &owner[40..48], user)?;
                (true, &self.oe_key, hash)
            } else if hash_password(revision, password, &user[32..40], &[])? == user[..HASH_LEN] {
                let hash = hash_password(revision, password, &user[40..48], &[])?;
                (false, &self.ue_key, hash)
            } else {
                return Err(EncryptionError::BadPassword);
            };

        let key = decrypt_cbc_no_padding(&intermediate, &ZERO_IV, wrapped)?;
        let perms = decrypt_cbc_no_padding(&key, &ZERO_IV, &self.perms)?;
        if perms.get(9..12) != Some(PERMS_SIGNATURE) {
            warn!("Decrypted /Perms does not carry the expected signature");
            return Err(EncryptionError::BadPassword);
        }

        let p = u32::from_le_bytes([perms[0], perms[1], perms[2], perms[3]]);
        self.permissions = Permissions::from_bits_retain(p);
        self.encrypt_metadata = perms[8] == b'T';
        self.key = key;
        self.owner_password_used = owner_password_used;
        Ok(())
    }

    /// Recover the user password from `/O` given the owner password
    ///
    /// Only legacy revisions store the user password reversibly.
    pub fn compute_user_password(&self, owner_password: &[u8]) -> EncryptionResult<Vec<u8>> {
        if self.algorithm == EncryptionAlgorithm::Aes256 {
            return Err(EncryptionError::UnsupportedConfiguration(
                "user password recovery needs revision 4 or lower".to_string(),
            ));
        }
        if self.owner_key.is_empty() {
            return Err(EncryptionError::MissingEntry("O"));
        }

        let key_length = self.key.len();
        let user_pad = self.user_pad_from_owner(&pad_password(owner_password), key_length);
        if self.check_user_pad(&user_pad, key_length).is_none() {
            return Err(EncryptionError::BadPassword);
        }
        Ok(strip_padding(&user_pad))
    }

    /// Key for one object's strings and streams
    pub fn object_key(&self, id: ObjectId) -> Vec<u8> {
        if self.algorithm == EncryptionAlgorithm::Aes256 {
            return self.key.clone();
        }

        let mut input = Vec::with_capacity(self.key.len() + 5 + AES_SALT.len());
        input.extend_from_slice(&self.key);
        input.extend_from_slice(&id.number().to_le_bytes()[..3]);
        input.extend_from_slice(&id.generation().to_le_bytes());
        if self.algorithm == EncryptionAlgorithm::Aes128 {
            input.extend_from_slice(AES_SALT);
        }

        let digest = md5::compute(&input);
        let len = (self.key.len() + 5).min(16);
        digest[..len].to_vec()
    }

    /// Encrypt stream data of object `id`; AES output starts with a random IV
    pub fn encrypt_stream(&self, id: ObjectId, data: &[u8]) -> EncryptionResult<Vec<u8>> {
        self.encrypt_stream_with_iv(id, data, &generate_iv())
    }

    /// As [`encrypt_stream`](Self::encrypt_stream) with a caller chosen IV; RC4 ignores it
    pub fn encrypt_stream_with_iv(
        &self,
        id: ObjectId,
        data: &[u8],
        iv: &[u8; BLOCK_SIZE],
    ) -> EncryptionResult<Vec<u8>> {
        let key = self.object_key(id);
        if !self.algorithm.is_aes() {
            return Ok(rc4(&key, data));
        }

        let mut output = Vec::with_capacity(self.calculate_stream_size(data.len()));
        output.extend_from_slice(iv);
        output.extend(encrypt_cbc(&key, iv, data)?);
        Ok(output)
    }

    pub fn decrypt_stream(&self, id: ObjectId, data: &[u8]) -> EncryptionResult<Vec<u8>> {
        let key = self.object_key(id);
        if !self.algorithm.is_aes() {
            return Ok(rc4(&key, data));
        }

        if data.len() < BLOCK_SIZE {
            return Err(EncryptionError::InvalidCiphertext(format!(
                "{} bytes, shorter than the IV",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(BLOCK_SIZE);
        decrypt_cbc(&key, iv, ciphertext)
    }

    pub fn encrypt_string(&self, id: ObjectId, data: &[u8]) -> EncryptionResult<Vec<u8>> {
        self.encrypt_stream(id, data)
    }

    pub fn decrypt_string(&self, id: ObjectId, data: &[u8]) -> EncryptionResult<Vec<u8>> {
        self.decrypt_stream(id, data)
    }

    /// Size of `plain_len` bytes once encrypted
    pub fn calculate_stream_size(&self, plain_len: usize) -> usize {
        if self.algorithm.is_aes() {
            (plain_len & !(BLOCK_SIZE - 1)) + 2 * BLOCK_SIZE
        } else {
            plain_len
        }
    }

    /// `/Encrypt` dictionary describing this handler
    pub fn encryption_dictionary(&self) -> EncryptionDictionary {
        let mut dict = EncryptionDictionary {
            filter: "Standard".to_string(),
            v: 1,
            r: self.revision,
            length: None,
            crypt_filter: None,
            stm_f: None,
            str_f: None,
            o: self.owner_key.clone(),
            u: self.user_key.clone(),
            oe: None,
            ue: None,
            perms: None,
            p: self.permissions,
            encrypt_metadata: self.encrypt_metadata,
        };

        let method = match (self.algorithm, self.revision) {
            (EncryptionAlgorithm::Rc4Bits40, _) => None,
            (EncryptionAlgorithm::Rc4Bits128, 3) => {
                dict.v = 2;
                dict.length = Some(self.key_bits());
                None
            }
            (EncryptionAlgorithm::Rc4Bits128, _) => Some(CryptFilterMethod::V2),
            (EncryptionAlgorithm::Aes128, _) => Some(CryptFilterMethod::AesV2),
            (EncryptionAlgorithm::Aes256, _) => {
                dict.oe = Some(self.oe_key.clone());
                dict.ue = Some(self.ue_key.clone());
                dict.perms = Some(self.perms.clone());
                Some(CryptFilterMethod::AesV3)
            }
        };

        if let Some(method) = method {
            dict.v = if method == CryptFilterMethod::AesV3 { 5 } else { 4 };
            dict.length = Some(self.key_bits());
            dict.crypt_filter = Some(CryptFilter::standard(method));
            dict.stm_f = Some(STANDARD_CRYPT_FILTER.to_string());
            dict.str_f = Some(STANDARD_CRYPT_FILTER.to_string());
        }

        dict
    }

    fn key_bits(&self) -> i64 {
        (self.key.len() * 8) as i64
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Global file key
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn owner_key(&self) -> &[u8] {
        &self.owner_key
    }

    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    pub fn document_id(&self) -> &[u8] {
        &self.document_id
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Whether the key was recovered with the owner password
    pub fn is_owner_password(&self) -> bool {
        self.owner_password_used
    }
}

impl fmt::Debug for StandardSecurityHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardSecurityHandler")
            .field("algorithm", &self.algorithm)
            .field("revision", &self.revision)
            .field("key_length", &self.key.len())
            .field("permissions", &self.permissions)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("owner_password_used", &self.owner_password_used)
            .finish_non_exhaustive()
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

/// Password bytes before the padding suffix
fn strip_padding(user_pad: &[u8]) -> Vec<u8> {
    let len = (0..user_pad.len())
        .find(|&i| {
            let tail = &user_pad[i..];
            tail.len() <= PASSWORD_PADDING.len() && *tail == PASSWORD_PADDING[..tail.len()]
        })
        .unwrap_or(user_pad.len());
    user_pad[..len].to_vec()
}

fn random_owner_password() -> Vec<u8> {
    let mut password = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut password);
    password
}

fn truncate_aes256_password(password: &[u8]) -> &[u8] {
    &password[..password.len().min(MAX_AES256_PASSWORD)]
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|byte| byte ^ round).collect()
}

/// MD5 of the padded owner password, stretched for revision 3 and later
fn owner_digest(owner_pad: &[u8; 32], revision: i64, key_length: usize) -> Vec<u8> {
    let mut digest = md5::compute(owner_pad).0;
    if revision >= 3 {
        for _ in 0..50 {
            digest = md5::compute(&digest[..key_length]).0;
        }
    }
    digest[..key_length].to_vec()
}

/// `/O` for legacy revisions
fn compute_owner_key(
    user_pad: &[u8; 32],
    owner_pad: &[u8; 32],
    revision: i64,
    key_length: usize,
) -> Vec<u8> {
    let digest = owner_digest(owner_pad, revision, key_length);
    if revision == 2 {
        return rc4(&digest, user_pad);
    }

    let mut owner_key = user_pad.to_vec();
    for round in 0..20u8 {
        owner_key = rc4(&xor_key(&digest, round), &owner_key);
    }
    owner_key
}

fn compute_file_key(
    user_pad: &[u8],
    owner_key: &[u8],
    permissions: Permissions,
    document_id: &[u8],
    revision: i64,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut input = Vec::with_capacity(user_pad.len() + owner_key.len() + document_id.len() + 8);
    input.extend_from_slice(user_pad);
    input.extend_from_slice(owner_key);
    input.extend_from_slice(&permissions.bits().to_le_bytes());
    input.extend_from_slice(document_id);
    if revision >= 4 && !encrypt_metadata {
        input.extend_from_slice(&METADATA_MARKER);
    }

    let mut digest = md5::compute(&input).0;
    if revision >= 3 {
        for _ in 0..50 {
            digest = md5::compute(&digest[..key_length]).0;
        }
    }
    digest[..key_length].to_vec()
}

/// `/U` for legacy revisions
fn compute_user_key(key: &[u8], document_id: &[u8], revision: i64) -> Vec<u8> {
    if revision == 2 {
        return rc4(key, &PASSWORD_PADDING);
    }

    let mut input = PASSWORD_PADDING.to_vec();
    input.extend_from_slice(document_id);
    let mut user_key = md5::compute(&input).to_vec();
    for round in 0..20u8 {
        user_key = rc4(&xor_key(key, round), &user_key);
    }
    user_key.resize(32, 0);
    user_key
}

/// Password hash of revisions 5 (SHA-256) and 6 (ISO 32000-2 Algorithm 2.B)
fn hash_password(
    revision: i64,
    password: &[u8],
    salt: &[u8],
    user_key: &[u8],
) -> EncryptionResult<Vec<u8>> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(user_key);
    let mut k = hasher.finalize().to_vec();
    if revision < 6 {
        return Ok(k);
    }

    let mut round = 0u32;
    loop {
        let mut sequence = Vec::with_capacity(password.len() + k.len() + user_key.len());
        sequence.extend_from_slice(password);
        sequence.extend_from_slice(&k);
        sequence.extend_from_slice(user_key);
        let k1 = sequence.repeat(64);

        let e = encrypt_cbc_no_padding(&k[..16], &k[16..32], &k1)?;
        // First 16 bytes as a big-endian number mod 3; 256 is 1 mod 3
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        let last = e.last().copied().map(u32::from).unwrap_or(0);
        if round >= 64 && last + 32 <= round {
            break;
        }
    }

    k.truncate(HASH_LEN);
    Ok(k)
}
