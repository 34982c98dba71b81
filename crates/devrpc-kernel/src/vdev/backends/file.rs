//! File-backed flash image.
//!
//! Backs the `FILE` device type: a regular file on the host holds the raw
//! device contents. Images created from options are confined to an image
//! root directory.

use parking_lot::Mutex;
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::memory::{DEFAULT_ERASE_SIZE, ERASED_BYTE};
use super::parse_opts;
use crate::vdev::error::{DevError, DevResult};
use crate::vdev::ops::{DeviceOps, check_aligned, check_range};
use crate::vdev::types::EraseSizes;

/// Chunk size used when filling erased regions.
const FILL_CHUNK: usize = 4096;

/// Options accepted by the `FILE` device type.
#[derive(Debug, Clone, Deserialize)]
pub struct FileOpts {
    /// Path of the image file, relative to the image root. Created if
    /// missing.
    pub path: PathBuf,
    /// Device size in bytes. Defaults to the current file length.
    #[serde(default)]
    pub size: Option<u64>,
    /// Erase granularity in bytes.
    #[serde(default = "default_erase_size")]
    pub erase_size: u64,
}

fn default_erase_size() -> u64 {
    DEFAULT_ERASE_SIZE
}

/// Flash image stored in a host file.
///
/// If the file is shorter than the requested size it is extended with
/// erased bytes. Access is serialized through an internal mutex.
#[derive(Debug)]
pub struct FileDevice {
    file: Mutex<File>,
    path: PathBuf,
    size: u64,
    erase_size: u64,
}

impl FileDevice {
    /// Open (or create) an image at `path`.
    pub fn open(path: impl Into<PathBuf>, size: Option<u64>, erase_size: u64) -> DevResult<Self> {
        let path = path.into();
        if erase_size == 0 {
            return Err(DevError::invalid("erase_size must be non-zero"));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let current = file.metadata()?.len();
        let size = match size {
            Some(size) => size,
            None if current > 0 => current,
            None => {
                return Err(DevError::invalid(format!(
                    "{} is empty and no size was given",
                    path.display()
                )));
            }
        };

        if current < size {
            file.seek(SeekFrom::Start(current))?;
            fill_erased(&mut file, size - current)?;
            file.flush()?;
        }

        Ok(Self {
            file: Mutex::new(file),
            path,
            size,
            erase_size,
        })
    }

    /// Build a device from a `FILE` type options string. `opts.path` must
    /// resolve to a file under `root`.
    pub fn from_opts(opts: &str, root: &Path) -> DevResult<Self> {
        let opts: FileOpts = parse_opts(opts)?;
        let path = resolve_image_path(root, &opts.path)?;
        Self::open(path, opts.size, opts.erase_size)
    }

    /// Path of the backing image.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve an image path within `root`.
///
/// Relative paths are joined to the root. Symlinks and `..` are resolved
/// before the check, so the result never escapes the root.
fn resolve_image_path(root: &Path, path: &Path) -> DevResult<PathBuf> {
    let root = root.canonicalize()?;
    let full = root.join(path);

    let canonical = if full.exists() {
        full.canonicalize()?
    } else {
        // New image: the parent must exist
        let parent = full
            .parent()
            .ok_or_else(|| DevError::invalid("image path has no parent"))?;
        let file_name = full
            .file_name()
            .ok_or_else(|| DevError::invalid("image path has no file name"))?;
        parent.canonicalize()?.join(file_name)
    };

    if !canonical.starts_with(&root) {
        return Err(DevError::invalid(format!(
            "{} is not under {}",
            canonical.display(),
            root.display()
        )));
    }
    Ok(canonical)
}

/// Write `len` erased bytes at the current position.
fn fill_erased(file: &mut File, mut len: u64) -> DevResult<()> {
    let chunk = [ERASED_BYTE; FILL_CHUNK];
    while len > 0 {
        let n = len.min(FILL_CHUNK as u64) as usize;
        file.write_all(&chunk[..n])?;
        len -= n as u64;
    }
    Ok(())
}

impl DeviceOps for FileDevice {
    fn read(&self, offset: u64, buf: &mut [u8]) -> DevResult<()> {
        check_range(offset, buf.len() as u64, self.size)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DevError::corrupt(format!(
                "{} is shorter than the device size {}",
                self.path.display(),
                self.size
            )),
            _ => DevError::Io(e),
        })
    }

    fn write(&self, offset: u64, data: &[u8]) -> DevResult<()> {
        check_range(offset, data.len() as u64, self.size)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn erase(&self, offset: u64, len: u64) -> DevResult<()> {
        check_aligned(offset, len, self.erase_size)?;
        check_range(offset, len, self.size)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        fill_erased(&mut file, len)?;
        file.flush()?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn erase_sizes(&self, sizes: &mut EraseSizes) -> DevResult<()> {
        sizes[0] = self.erase_size;
        Ok(())
    }
}
