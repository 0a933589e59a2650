//! Append-only single-file key-value sink
//!
//! File format:
//! ```text
//! [HEADER: 16 bytes]
//!   - magic: 8 bytes ("PISTISKV")
//!   - version: 4 bytes (u32 LE)
//!   - reserved: 4 bytes
//!
//! [RECORDS: variable]
//!   - key_len: 4 bytes (u32 LE)
//!   - key: key_len bytes
//!   - value_len: 4 bytes (u32 LE)
//!   - value: value_len bytes
//! ```
//!
//! A `put` appends a record unless the key already holds that value; later
//! records for the same key supersede earlier ones when the file is read back.

use crate::store::KeyValueSink;
use crate::{Error, Result, MAGIC, VERSION};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER_SIZE: u64 = 16;

/// A key-value sink backed by a single append-only file
pub struct FileSink {
    /// Path to the sink file
    path: PathBuf,
    /// The file handle
    file: RwLock<File>,
    /// Number of records appended through this handle
    appended: RwLock<u64>,
    /// Latest value per key, loaded on open
    latest: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl FileSink {
    /// Create a new sink file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        file.write_all(&header)?;
        file.sync_all()?;

        Ok(FileSink {
            path,
            file: RwLock::new(file),
            appended: RwLock::new(0),
            latest: RwLock::new(HashMap::new()),
        })
    }

    /// Open an existing sink file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let latest = read_records(&mut file)?;

        Ok(FileSink {
            path,
            file: RwLock::new(file),
            appended: RwLock::new(0),
            latest: RwLock::new(latest),
        })
    }

    /// Open or create a sink file
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle since it was opened
    pub fn appended(&self) -> u64 {
        *self.appended.read()
    }

    /// Read back the latest value of every key in the file
    pub fn entries(&self) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
        read_records(&mut self.file.write())
    }

    /// Flush buffered writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.write().sync_all()?;
        Ok(())
    }
}

impl KeyValueSink for FileSink {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = u32::try_from(key.len())
            .map_err(|_| Error::Format(format!("key too long: {} bytes", key.len())))?;
        let value_len = u32::try_from(value.len())
            .map_err(|_| Error::Format(format!("value too long: {} bytes", value.len())))?;

        if self.latest.read().get(key).map(Vec::as_slice) == Some(value) {
            return Ok(());
        }

        let mut record = Vec::with_capacity(8 + key.len() + value.len());
        record.extend_from_slice(&key_len.to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(&value_len.to_le_bytes());
        record.extend_from_slice(value);

        {
            let mut file = self.file.write();
            file.seek(SeekFrom::End(0))?;
            file.write_all(&record)?;
        }
        self.latest.write().insert(key.to_vec(), value.to_vec());
        *self.appended.write() += 1;
        Ok(())
    }
}

fn read_header(file: &mut File) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    file.read_exact(&mut header)?;

    if &header[0..8] != MAGIC {
        return Err(Error::Format("Invalid magic bytes".into()));
    }

    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&header[8..12]);
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(Error::Format(format!(
            "Version mismatch: expected {}, found {}",
            VERSION, version
        )));
    }
    Ok(())
}

/// Latest value of every key, reading from the start of the file
fn read_records(file: &mut File) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
    file.seek(SeekFrom::Start(0))?;
    read_header(file)?;

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let mut entries = HashMap::new();
    let mut cursor = data.as_slice();
    while !cursor.is_empty() {
        let key = take_field(&mut cursor)?;
        let value = take_field(&mut cursor)?;
        entries.insert(key, value);
    }
    Ok(entries)
}

/// Split one length-prefixed field off the front of `cursor`
fn take_field(cursor: &mut &[u8]) -> Result<Vec<u8>> {
    if cursor.len() < 4 {
        return Err(Error::Format("Truncated record length".into()));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&cursor[..4]);
    let len = u32::from_le_bytes(len_bytes) as usize;

    let rest = &cursor[4..];
    if rest.len() < len {
        return Err(Error::Format("Truncated record body".into()));
    }
    let field = rest[..len].to_vec();
    *cursor = &rest[len..];
    Ok(field)
}
