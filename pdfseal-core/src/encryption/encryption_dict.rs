//! PDF encryption dictionary structures
//!
//! Reads and writes the `/Encrypt` dictionary of the standard security
//! handler (ISO 32000-1 Tables 20 and 21, ISO 32000-2 Table 21).

use super::{EncryptionAlgorithm, EncryptionError, EncryptionResult, Permissions};
use crate::objects::{Dictionary, Object};

/// Name of the only crypt filter this handler writes
pub const STANDARD_CRYPT_FILTER: &str = "StdCF";

/// Crypt filter method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptFilterMethod {
    /// No encryption
    None,
    /// RC4
    V2,
    /// AES-128
    AesV2,
    /// AES-256
    AesV3,
}

impl CryptFilterMethod {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            CryptFilterMethod::None => "None",
            CryptFilterMethod::V2 => "V2",
            CryptFilterMethod::AesV2 => "AESV2",
            CryptFilterMethod::AesV3 => "AESV3",
        }
    }

    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(CryptFilterMethod::None),
            "V2" => Some(CryptFilterMethod::V2),
            "AESV2" => Some(CryptFilterMethod::AesV2),
            "AESV3" => Some(CryptFilterMethod::AesV3),
            _ => None,
        }
    }
}

/// Crypt filter definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptFilter {
    pub name: String,
    pub method: CryptFilterMethod,
    /// Key length in bytes
    pub length: Option<i64>,
}

impl CryptFilter {
    /// `/StdCF` with the key length matching `method`
    pub fn standard(method: CryptFilterMethod) -> Self {
        Self {
            name: STANDARD_CRYPT_FILTER.to_string(),
            method,
            length: match method {
                CryptFilterMethod::V2 | CryptFilterMethod::AesV2 => Some(16),
                CryptFilterMethod::AesV3 => Some(32),
                CryptFilterMethod::None => None,
            },
        }
    }

    pub fn to_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("CFM", Object::Name(self.method.pdf_name().to_string()));
        if let Some(length) = self.length {
            dict.set("Length", length);
        }
        dict.set("AuthEvent", Object::Name("DocOpen".to_string()));
        dict
    }
}

/// PDF encryption dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionDictionary {
    /// Always "Standard" for the standard security handler
    pub filter: String,
    /// Algorithm version (1, 2, 4 or 5)
    pub v: i64,
    /// Revision (2 to 6)
    pub r: i64,
    /// Key length in bits
    pub length: Option<i64>,
    /// The crypt filter named by `/StmF`, if any
    pub crypt_filter: Option<CryptFilter>,
    pub stm_f: Option<String>,
    pub str_f: Option<String>,
    /// Owner password entry (32 or 48 bytes)
    pub o: Vec<u8>,
    /// User password entry (32 or 48 bytes)
    pub u: Vec<u8>,
    /// Wrapped file key for the owner (revisions 5 and 6)
    pub oe: Option<Vec<u8>>,
    /// Wrapped file key for the user (revisions 5 and 6)
    pub ue: Option<Vec<u8>>,
    /// Encrypted permissions block (revisions 5 and 6)
    pub perms: Option<Vec<u8>>,
    pub p: Permissions,
    pub encrypt_metadata: bool,
}

impl EncryptionDictionary {
    /// Read an `/Encrypt` dictionary
    ///
    /// Checks presence and size of the password entries; whether the
    /// revision is supported is decided by [`EncryptionDictionary::algorithm`].
    pub fn from_dict(dict: &Dictionary) -> EncryptionResult<Self> {
        let filter = dict
            .get_name("Filter")
            .ok_or(EncryptionError::MissingEntry("Filter"))?;
        if filter != "Standard" {
            return Err(EncryptionError::UnsupportedConfiguration(format!(
                "security handler /{filter}"
            )));
        }

        let v = dict.get_integer("V").unwrap_or(0);
        let r = dict
            .get_integer("R")
            .ok_or(EncryptionError::MissingEntry("R"))?;
        let o = dict
            .get_bytes("O")
            .ok_or(EncryptionError::MissingEntry("O"))?;
        let u = dict
            .get_bytes("U")
            .ok_or(EncryptionError::MissingEntry("U"))?;
        let p = dict
            .get_integer("P")
            .ok_or(EncryptionError::MissingEntry("P"))?;

        let (oe, ue, perms) = if r >= 5 {
            (
                Some(required_bytes(dict, "OE", 32)?),
                Some(required_bytes(dict, "UE", 32)?),
                Some(required_bytes(dict, "Perms", 16)?),
            )
        } else {
            (None, None, None)
        };

        let password_entry_len = if r >= 5 { 48 } else { 32 };
        let o = truncated(o, "O", password_entry_len)?;
        let u = truncated(u, "U", password_entry_len)?;

        let stm_f = dict.get_name("StmF").map(str::to_string);
        let str_f = dict.get_name("StrF").map(str::to_string);
        let crypt_filter = read_crypt_filter(dict, stm_f.as_deref())?;

        Ok(Self {
            filter: filter.to_string(),
            v,
            r,
            length: dict.get_integer("Length"),
            crypt_filter,
            stm_f,
            str_f,
            o,
            u,
            oe,
            ue,
            perms,
            p: Permissions::from_p_value(p),
            encrypt_metadata: dict
                .get("EncryptMetadata")
                .and_then(Object::as_bool)
                .unwrap_or(true),
        })
    }

    /// Algorithm and key length in bytes described by this dictionary
    pub fn algorithm(&self) -> EncryptionResult<(EncryptionAlgorithm, usize)> {
        let unsupported = || {
            EncryptionError::UnsupportedConfiguration(format!(
                "V {} R {} {}",
                self.v,
                self.r,
                self.crypt_filter
                    .as_ref()
                    .map(|cf| cf.method.pdf_name())
                    .unwrap_or("")
            ))
        };

        match self.r {
            2 => Ok((EncryptionAlgorithm::Rc4Bits40, 5)),
            3 => {
                let bits = self.length.unwrap_or(40);
                if !(40..=128).contains(&bits) || bits % 8 != 0 {
                    return Err(EncryptionError::MalformedDictionary(format!(
                        "key length of {bits} bits"
                    )));
                }
                Ok((EncryptionAlgorithm::Rc4Bits128, (bits / 8) as usize))
            }
            4 => match self.crypt_filter.as_ref().map(|cf| cf.method) {
                Some(CryptFilterMethod::V2) => Ok((EncryptionAlgorithm::Rc4Bits128, 16)),
                Some(CryptFilterMethod::AesV2) => Ok((EncryptionAlgorithm::Aes128, 16)),
                _ => Err(unsupported()),
            },
            5 | 6 => match self.crypt_filter.as_ref().map(|cf| cf.method) {
                None | Some(CryptFilterMethod::AesV3) => Ok((EncryptionAlgorithm::Aes256, 32)),
                _ => Err(unsupported()),
            },
            _ => Err(unsupported()),
        }
    }

    /// Convert to PDF dictionary
    pub fn to_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();

        dict.set("Filter", Object::Name(self.filter.clone()));
        dict.set("V", self.v);
        if let Some(length) = self.length {
            dict.set("Length", length);
        }
        dict.set("R", self.r);
        dict.set("O", Object::String(self.o.clone()));
        dict.set("U", Object::String(self.u.clone()));
        if let Some(oe) = &self.oe {
            dict.set("OE", Object::String(oe.clone()));
        }
        if let Some(ue) = &self.ue {
            dict.set("UE", Object::String(ue.clone()));
        }
        if let Some(perms) = &self.perms {
            dict.set("Perms", Object::String(perms.clone()));
        }
        dict.set("P", i64::from(self.p.p_value()));

        if let Some(filter) = &self.crypt_filter {
            let mut cf = Dictionary::new();
            cf.set(filter.name.clone(), filter.to_dict());
            dict.set("CF", cf);
        }
        if let Some(stm_f) = &self.stm_f {
            dict.set("StmF", Object::Name(stm_f.clone()));
        }
        if let Some(str_f) = &self.str_f {
            dict.set("StrF", Object::Name(str_f.clone()));
        }
        if !self.encrypt_metadata {
            dict.set("EncryptMetadata", false);
        }

        dict
    }
}

fn required_bytes(dict: &Dictionary, key: &'static str, len: usize) -> EncryptionResult<Vec<u8>> {
    let bytes = dict.get_bytes(key).ok_or(EncryptionError::MissingEntry(key))?;
    truncated(bytes, key, len)
}

/// First `len` bytes of a password entry; shorter entries are malformed
fn truncated(bytes: &[u8], key: &str, len: usize) -> EncryptionResult<Vec<u8>> {
    if bytes.len() < len {
        return Err(EncryptionError::MalformedDictionary(format!(
            "/{key} has {} bytes, expected {len}",
            bytes.len()
        )));
    }
    Ok(bytes[..len].to_vec())
}

fn read_crypt_filter(
    dict: &Dictionary,
    stm_f: Option<&str>,
) -> EncryptionResult<Option<CryptFilter>> {
    let name = stm_f.unwrap_or(STANDARD_CRYPT_FILTER);
    let Some(filter) = dict.get_dict("CF").and_then(|cf| cf.get_dict(name)) else {
        return Ok(None);
    };

    let method_name = filter.get_name("CFM").unwrap_or("None");
    let method = CryptFilterMethod::from_pdf_name(method_name).ok_or_else(|| {
        EncryptionError::UnsupportedConfiguration(format!("crypt filter method /{method_name}"))
    })?;

    Ok(Some(CryptFilter {
        name: name.to_string(),
        method,
        length: filter.get_integer("Length"),
    }))
}
