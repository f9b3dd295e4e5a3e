//! PDF permissions according to ISO 32000-1 Table 22

use super::EncryptionAlgorithm;
use bitflags::bitflags;

/// Reserved bits forced on for 40-bit RC4 (bits 7-32)
const RESERVED_RC4_40: u32 = 0xFFFF_FFC0;

/// Reserved bits forced on for every later revision (bits 7-8, 13-32)
const RESERVED: u32 = 0xFFFF_F0C0;

/// Bits 1-2 must be zero
const LOW_BITS_CLEAR: u32 = 0xFFFF_FFFC;

bitflags! {
    /// User access permissions stored in `/P`
    ///
    /// Bits without a named flag are retained as they are, so a value read
    /// from a file survives unchanged until it is normalized.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document (bit 3)
        const PRINT = 1 << 2;
        /// Modify contents (bit 4)
        const MODIFY_CONTENTS = 1 << 3;
        /// Copy or extract text and graphics (bit 5)
        const COPY = 1 << 4;
        /// Add or modify annotations, fill forms (bit 6)
        const MODIFY_ANNOTATIONS = 1 << 5;
        /// Fill in existing form fields (bit 9)
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility (bit 10)
        const ACCESSIBILITY = 1 << 9;
        /// Insert, rotate or delete pages (bit 11)
        const ASSEMBLE = 1 << 10;
        /// Print at full quality (bit 12)
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    /// Interpret a signed `/P` value
    pub fn from_p_value(p: i64) -> Self {
        Self::from_bits_retain(p as u32)
    }

    /// Signed value as written to `/P`
    pub fn p_value(self) -> i32 {
        self.bits() as i32
    }

    /// Force the reserved bits required for `algorithm`
    ///
    /// Normalizing twice gives the same value as normalizing once.
    pub fn normalized(self, algorithm: EncryptionAlgorithm) -> Self {
        let reserved = match algorithm {
            EncryptionAlgorithm::Rc4Bits40 => RESERVED_RC4_40,
            _ => RESERVED,
        };
        Self::from_bits_retain((self.bits() | reserved) & LOW_BITS_CLEAR)
    }
}

impl Default for Permissions {
    /// Nothing allowed
    fn default() -> Self {
        Self::empty()
    }
}
