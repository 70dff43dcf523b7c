//! Backing stores
//!
//! A shard only needs positioned reads, positioned writes at its append
//! cursor, a length and a close. Anything offering those can hold a shard:
//!
//! - `FileStore` wraps a local file (production)
//! - `MemoryStore` keeps bytes in a shared buffer (tests, benchmarks)

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Storage capability required by a shard log
pub trait BackingStore {
    /// Read into `buf` starting at `pos`.
    ///
    /// Fills as much of `buf` as the store holds; returns the byte count,
    /// 0 at end of store.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data` at `pos`, or fail
    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()>;

    /// Current size in bytes
    fn len(&self) -> io::Result<u64>;

    /// Cut the store down to `len` bytes
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Make previous writes durable
    fn sync(&mut self) -> io::Result<()>;

    /// Release the underlying resource. Called once by the owning shard.
    fn close(&mut self) -> io::Result<()>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Local file backing store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
}

impl FileStore {
    /// Open a file read/write, creating it when absent
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackingStore for FileStore {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        // &File implements Read + Seek, so reads don't need &mut self
        let mut file = &self.file;
        file.seek(SeekFrom::Start(pos))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(data)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory backing store.
///
/// Clones share the same buffer, so a test can keep a handle after the
/// shard closes and reopen the same "file" later.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with raw bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(bytes.into())),
        }
    }

    /// Copy of the raw contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Cut the buffer down to `len` bytes (simulates a torn write)
    pub fn truncate(&self, len: usize) {
        self.data.lock().truncate(len);
    }

    /// Append raw bytes past the current end
    pub fn append_raw(&self, bytes: &[u8]) {
        self.data.lock().extend_from_slice(bytes);
    }
}

impl BackingStore for MemoryStore {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.lock();

        let pos = pos as usize;
        if pos >= data.len() {
            return Ok(0);
        }

        let available = data.len() - pos;
        let to_read = buf.len().min(available);
        buf[..to_read].copy_from_slice(&data[pos..pos + to_read]);
        Ok(to_read)
    }

    fn write_at(&mut self, pos: u64, bytes: &[u8]) -> io::Result<()> {
        let mut data = self.data.lock();

        let pos = pos as usize;
        let end = pos + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[pos..end].copy_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.data.lock().resize(len as usize, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
