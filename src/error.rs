use crate::png::PngError;

/// An error from decoding a PNG image source.
///
/// Every error ends the info query or decode that produced it. Callers that
/// only care whether the image is available can treat all of these the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecodeError {
  /// The source kind isn't one that the PNG decoder handles.
  UnsupportedSource,

  /// A file source's path doesn't end with `png`.
  ExtensionMismatch,

  /// An in-memory source doesn't start with the PNG signature.
  SignatureMismatch,

  /// The file couldn't be opened.
  FileOpen,

  /// Reading from the source failed.
  Io,

  /// The source ran out of bytes before the image was complete.
  UnexpectedEof,

  /// A chunk declared a length that doesn't fit a signed 32-bit value.
  ChunkLength(u32),

  /// The PNG parser rejected the data it was fed.
  Parse(PngError),

  /// The allocator couldn't give us enough space for the output buffer.
  Alloc,

  /// The image is too large.
  ///
  /// The decoder limits the width and height of images it processes (17,000
  /// by default) to prevent accidental out-of-memory problems.
  DimensionsTooLarge,

  /// A checked math operation failed.
  CheckedMath,

  /// No registered decoder accepted the source.
  NoDecoder,
}
impl From<PngError> for DecodeError {
  #[inline]
  fn from(e: PngError) -> Self {
    Self::Parse(e)
  }
}
impl From<alloc::collections::TryReserveError> for DecodeError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::Alloc
  }
}
#[cfg(feature = "std")]
impl From<std::io::Error> for DecodeError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
      _ => Self::Io,
    }
  }
}
impl core::fmt::Display for DecodeError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::UnsupportedSource => f.write_str("unsupported image source"),
      Self::ExtensionMismatch => f.write_str("file name doesn't end with `png`"),
      Self::SignatureMismatch => f.write_str("data doesn't start with the PNG signature"),
      Self::FileOpen => f.write_str("couldn't open file"),
      Self::Io => f.write_str("read error"),
      Self::UnexpectedEof => f.write_str("unexpected end of input"),
      Self::ChunkLength(len) => write!(f, "illegal chunk length {len}"),
      Self::Parse(e) => write!(f, "PNG parse error: {e}"),
      Self::Alloc => f.write_str("couldn't allocate the output buffer"),
      Self::DimensionsTooLarge => f.write_str("image dimensions too large"),
      Self::CheckedMath => f.write_str("image size overflow"),
      Self::NoDecoder => f.write_str("no decoder accepted the image source"),
    }
  }
}
#[cfg(feature = "std")]
impl std::error::Error for DecodeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Parse(e) => Some(e),
      _ => None,
    }
  }
}
