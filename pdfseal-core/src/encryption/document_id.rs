//! File identifiers for the trailer `/ID` entry (ISO 32000-1 Section 14.4)

use crate::objects::Object;
use chrono::Utc;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence shared by every generator
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Source of unique 16-byte document identifiers
///
/// Identifiers only need to be unique, not secret. The sequence number is
/// shared across the process and each generator adds a random nonce, so two
/// generators never hand out the same id even within one millisecond.
#[derive(Debug)]
pub struct DocumentIdGenerator {
    nonce: u64,
}

impl DocumentIdGenerator {
    pub fn new() -> Self {
        Self {
            nonce: rand::thread_rng().next_u64(),
        }
    }

    /// MD5 of wall-clock time, process id, sequence number and nonce
    pub fn next_id(&self) -> Vec<u8> {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let seed = format!(
            "{}+{}+{}+{:016x}",
            Utc::now().timestamp_millis(),
            std::process::id(),
            sequence,
            self.nonce
        );
        md5::compute(seed.as_bytes()).to_vec()
    }
}

impl Default for DocumentIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-element `/ID` array
///
/// The first element identifies the original document and is kept as is.
/// The second is fresh when the document was modified, otherwise a copy of
/// the first. Without an existing id both elements come from `generator`.
pub fn file_id_array(
    original: Option<&[u8]>,
    modified: bool,
    generator: &DocumentIdGenerator,
) -> Object {
    let first = original
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| generator.next_id());
    let second = if modified {
        generator.next_id()
    } else {
        first.clone()
    };
    Object::Array(vec![Object::HexString(first), Object::HexString(second)])
}
