//! Byte sources and file systems that the decoder reads from.

use crate::DecodeError;

/// A synchronous source of bytes, read front to back.
pub trait ByteSource {
  /// Reads up to `buf.len()` bytes, returning how many were read.
  ///
  /// Returning `Ok(0)` for a non-empty `buf` means the source is exhausted.
  fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError>;

  /// Fills all of `buf`.
  ///
  /// ## Failure
  /// * [`DecodeError::UnexpectedEof`] if the source ends first.
  /// * Anything that `read` returns.
  fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<(), DecodeError> {
    while !buf.is_empty() {
      match self.read(buf)? {
        0 => return Err(DecodeError::UnexpectedEof),
        n => buf = &mut buf[n..],
      }
    }
    Ok(())
  }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for R {
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
    loop {
      match std::io::Read::read(self, buf) {
        Ok(n) => return Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => {
          log::error!("read error: {e}");
          return Err(DecodeError::from(e));
        }
      }
    }
  }
}

#[cfg(not(feature = "std"))]
impl ByteSource for &[u8] {
  #[inline]
  fn read(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
    let n = buf.len().min(self.len());
    let (now, later) = self.split_at(n);
    buf[..n].copy_from_slice(now);
    *self = later;
    Ok(n)
  }
}

/// Opens files by path.
///
/// The PNG decoder only ever reads files front to back, and drops each file
/// before the call that opened it returns.
pub trait FileSystem {
  /// The open file type.
  type File: ByteSource;

  /// Opens the file at `path` for reading.
  fn open(&self, path: &str) -> Result<Self::File, DecodeError>;
}
impl<FS: FileSystem + ?Sized> FileSystem for &FS {
  type File = FS::File;
  #[inline]
  fn open(&self, path: &str) -> Result<Self::File, DecodeError> {
    (**self).open(path)
  }
}

/// The operating system's file system.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StdFileSystem;
#[cfg(feature = "std")]
impl FileSystem for StdFileSystem {
  type File = std::io::BufReader<std::fs::File>;
  #[inline]
  fn open(&self, path: &str) -> Result<Self::File, DecodeError> {
    match std::fs::File::open(path) {
      Ok(f) => Ok(std::io::BufReader::new(f)),
      Err(e) => {
        log::error!("couldn't open {path}: {e}");
        Err(DecodeError::FileOpen)
      }
    }
  }
}
