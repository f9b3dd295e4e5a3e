//! Seekable byte sources for the lexer
//!
//! A source is a cursor over the bytes of one PDF file with a single byte of
//! pushback. Sources are cheap to duplicate so that several lexers can walk
//! the same file independently.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Random access to the bytes of a PDF file
pub trait ByteSource {
    /// Read the next byte, `None` at end of data
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Push one byte back; the next `read_byte` returns it
    fn unread(&mut self, byte: u8);

    /// Move the cursor to an absolute position, dropping any pushed back byte
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// Current cursor position
    fn position(&self) -> u64;

    /// Total number of bytes
    fn len(&self) -> u64;

    /// Check if the source holds no bytes at all
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A second, independent cursor over the same bytes
    fn duplicate(&self) -> io::Result<Self>
    where
        Self: Sized;

    /// Fill `buf` as far as data allows, returning the number of bytes read
    fn read_fully(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.read_byte()? {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

/// In-memory source, duplicated by sharing the buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
    pos: u64,
    pushback: Option<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            pushback: None,
        }
    }

    /// The whole underlying buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for MemorySource {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl ByteSource for MemorySource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let byte = usize::try_from(self.pos)
            .ok()
            .and_then(|pos| self.data.get(pos).copied());
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn unread(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pushback = None;
        self.pos = pos;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos.saturating_sub(u64::from(self.pushback.is_some()))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn duplicate(&self) -> io::Result<Self> {
        Ok(Self {
            data: Arc::clone(&self.data),
            pos: self.pos,
            pushback: self.pushback,
        })
    }
}

/// File-backed source, duplicated by reopening the same path
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    reader: BufReader<File>,
    pos: u64,
    len: u64,
    pushback: Option<u8>,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            reader: BufReader::new(file),
            pos: 0,
            len,
            pushback: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.pos += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn unread(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pushback = None;
        self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos.saturating_sub(u64::from(self.pushback.is_some()))
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn duplicate(&self) -> io::Result<Self> {
        let mut copy = Self::open(&self.path)?;
        copy.seek(self.position())?;
        Ok(copy)
    }
}
