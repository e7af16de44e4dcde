//! Buffered, seekable container for a retrieved security document.
//!
//! Documents are kept in memory until they grow past
//! [`MAX_IN_MEMORY_SIZE`]. After that the data is moved to a temporary file
//! and every further byte goes to disk. Either way the document reads back
//! exactly what was ingested.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use super::Format;
use crate::{Error, Result};

/// Largest document size kept in memory (2 MiB).
pub const MAX_IN_MEMORY_SIZE: usize = 2 * 1024 * 1024;

const READ_CHUNK_SIZE: usize = 32 * 1024;
const HASH_BUFFER_SIZE: usize = 8192;

/// Where the document bytes currently live.
#[derive(Debug)]
enum Backing {
    Memory(Cursor<Vec<u8>>),
    Disk(NamedTempFile),
    Released,
}

/// A security document retrieved for a package.
///
/// Call [`Document::release`] when done; dropping the document releases it
/// as well.
#[derive(Debug)]
pub struct Document {
    format: Format,
    backing: Backing,
    len: u64,
    ingested: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty in-memory document with an unknown format.
    #[must_use]
    pub fn new() -> Self {
        Self {
            format: Format::empty(),
            backing: Backing::Memory(Cursor::new(Vec::new())),
            len: 0,
            ingested: false,
        }
    }

    /// Create a document of the given format from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the source or spilling to disk fails.
    pub fn from_reader(format: Format, reader: impl Read) -> Result<Self> {
        let mut doc = Self::new();
        doc.ingest(reader)?;
        doc.format = format;
        Ok(doc)
    }

    /// Create a document from the contents of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(e, path, "open"))?;
        let mut doc = Self::new();
        doc.ingest(file)?;
        Ok(doc)
    }

    /// The document format.
    #[must_use]
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Set the document format.
    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Number of bytes ingested.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the document holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the data is held in memory rather than in a temporary file.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }

    /// Path of the backing temporary file, if the document spilled to disk.
    #[must_use]
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Disk(file) => Some(file.path()),
            _ => None,
        }
    }

    /// Read `source` to the end and store its bytes in the document.
    ///
    /// Data stays in memory until it exceeds [`MAX_IN_MEMORY_SIZE`]; at that
    /// point everything read so far is written to a new temporary file and
    /// the rest of the stream is appended to it. The read position is left
    /// at the start of the data.
    ///
    /// A document ingests exactly once. If this fails the document is in an
    /// undefined state and must be discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the document was already filled, the source
    /// fails, or the temporary file cannot be written.
    pub fn ingest(&mut self, mut source: impl Read) -> Result<()> {
        if self.ingested || matches!(self.backing, Backing::Released) {
            return Err(Error::invalid_request("document data has already been ingested"));
        }
        self.ingested = true;

        let mut buffer: Vec<u8> = Vec::new();
        let mut spilled: Option<NamedTempFile> = None;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io_no_path(e, "read document data")),
            };
            total += n as u64;

            if let Some(file) = spilled.as_mut() {
                file.write_all(&chunk[..n])
                    .map_err(|e| Error::io(e, file.path(), "write document data"))?;
                continue;
            }

            buffer.extend_from_slice(&chunk[..n]);
            if buffer.len() > MAX_IN_MEMORY_SIZE {
                spilled = Some(spill_to_disk(&buffer)?);
                buffer = Vec::new();
            }
        }

        self.len = total;
        self.backing = match spilled {
            Some(mut file) => {
                file.flush()
                    .map_err(|e| Error::io(e, file.path(), "flush document data"))?;
                debug!(path = ?file.path(), bytes = total, "Document stored on disk");
                Backing::Disk(file)
            }
            None => {
                trace!(bytes = total, "Document stored in memory");
                Backing::Memory(Cursor::new(buffer))
            }
        };

        self.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io_no_path(e, "rewind document"))?;
        Ok(())
    }

    /// Compute the SHA-256 digest of the document as lowercase hex.
    ///
    /// The read position is reset to the start afterwards, whether hashing
    /// succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or rewound.
    pub fn hash(&mut self) -> Result<String> {
        self.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io_no_path(e, "rewind document"))?;

        let digest = self.digest_contents();
        let rewind = self.seek(SeekFrom::Start(0));

        let digest = digest.map_err(|e| Error::io_no_path(e, "hash document"))?;
        rewind.map_err(|e| Error::io_no_path(e, "rewind document"))?;
        Ok(digest)
    }

    fn digest_contents(&mut self) -> io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let n = match self.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Drop the document data and delete its temporary file, if any.
    ///
    /// Calling this more than once is harmless. The document cannot be read
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file could not be removed.
    pub fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.backing, Backing::Released) {
            Backing::Disk(file) => {
                let path = file.path().to_path_buf();
                file.close()
                    .map_err(|e| Error::io(e, &path, "remove document file"))?;
                trace!(?path, "Removed document file");
                Ok(())
            }
            Backing::Memory(_) | Backing::Released => Ok(()),
        }
    }
}

fn spill_to_disk(data: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("docprobe-payload-")
        .suffix(".raw")
        .tempfile()
        .map_err(|e| Error::io_no_path(e, "create document file"))?;
    file.write_all(data)
        .map_err(|e| Error::io(e, file.path(), "spill document to disk"))?;
    debug!(path = ?file.path(), bytes = data.len(), "Document exceeded memory threshold");
    Ok(file)
}

fn released_error() -> io::Error {
    io::Error::other("document has been released")
}

impl Read for Document {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.read(buf),
            Backing::Disk(file) => file.read(buf),
            Backing::Released => Err(released_error()),
        }
    }
}

impl Seek for Document {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.seek(pos),
            Backing::Disk(file) => file.seek(pos),
            Backing::Released => Err(released_error()),
        }
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Failed to release document");
        }
    }
}
