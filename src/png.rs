#![forbid(unsafe_code)]

//! Module for streaming PNG data.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! ## Streaming Design
//!
//! The [`PngParser`] is fed the PNG data stream a piece at a time, in whatever
//! sized pieces the caller happens to have on hand. It never needs the whole
//! file in memory. While it works it reports what it finds through a
//! [`PngEvents`] value that the caller passes to each [`feed`](PngParser::feed)
//! call:
//!
//! 1) `on_header(width, height)` once the `IHDR` chunk has been read and
//!    checked.
//! 2) `on_pixel(x, y, w, h, rgba)` once per pixel as soon as the scanline that
//!    holds the pixel has been decompressed and unfiltered. Every source color
//!    type is converted to [`RGBA8`] first.
//! 3) `on_complete()` when the `IEND` chunk is reached and every pixel has been
//!    delivered.
//!
//! The parser's own working memory is the zlib decompressor, a 32k sliding
//! window, and two scanlines.
//!
//! ## Parsing Errors
//!
//! Unlike a "decode what you can" parser, the stream is strict about anything
//! that would make the delivered pixels wrong:
//!
//! * The 8 byte PNG signature must be correct.
//! * The first chunk must be `IHDR`, and it must describe a legal image.
//! * Every chunk's CRC must match.
//! * Indexed images must have a `PLTE` before their first `IDAT`.
//! * The zlib stream must decompress, and every scanline must use one of the 5
//!   filter types.
//! * All scanlines must have been seen by the time `IEND` arrives.
//!
//! Chunks that this module doesn't use are still CRC checked, but otherwise
//! skipped. Any bytes after `IEND` are ignored.

use core::fmt::{Debug, Write};

use crate::pixel_formats::{RGB8, RGBA8};

mod chunk;
pub use chunk::*;

mod crc32;
pub use crc32::*;

mod ihdr;
pub use ihdr::*;

mod interlace;
pub(crate) use interlace::*;

mod unfilter;
pub(crate) use unfilter::*;

mod stream;
pub use stream::*;

/// The first 8 bytes of every PNG data stream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
#[inline]
#[must_use]
pub const fn is_png_header_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// An error from the streaming PNG parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PngError {
  /// The first 8 bytes weren't the PNG signature.
  BadSignature,
  /// A chunk declared a length above `2^31 - 1`.
  ChunkTooLong(u32),
  /// A chunk's declared CRC didn't match its data.
  CrcMismatch(PngChunkType),
  /// Some chunk other than `IHDR` came first.
  FirstChunkNotIHDR,
  /// A second `IHDR` was found.
  DuplicateIHDR,
  /// The `IHDR` data doesn't describe a legal image.
  IllegalIHDR,
  /// The `PLTE` is the wrong size, or came after the image data.
  IllegalPalette,
  /// The `tRNS` is the wrong size for the image's color type.
  IllegalTransparency,
  /// An indexed color image reached its image data without a palette.
  MissingPalette,
  /// The zlib data stream couldn't be decompressed.
  Decompression,
  /// A scanline used a filter type other than 0 through 4.
  IllegalFilter(u8),
  /// `IEND` arrived before all of the image's pixels did.
  MissingImageData,
  /// The allocator couldn't give us scanline or dictionary space.
  OutOfMemory,
  /// The [`PngEvents`] receiver asked the parser to stop.
  Stopped,
  /// The parser had already failed, and can't accept more data.
  Poisoned,
}
impl core::fmt::Display for PngError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::BadSignature => f.write_str("PNG signature is incorrect"),
      Self::ChunkTooLong(len) => write!(f, "chunk length {len} is too large"),
      Self::CrcMismatch(ty) => write!(f, "CRC mismatch in {ty:?} chunk"),
      Self::FirstChunkNotIHDR => f.write_str("first chunk is not IHDR"),
      Self::DuplicateIHDR => f.write_str("more than one IHDR chunk"),
      Self::IllegalIHDR => f.write_str("IHDR describes an illegal image"),
      Self::IllegalPalette => f.write_str("illegal PLTE chunk"),
      Self::IllegalTransparency => f.write_str("illegal tRNS chunk"),
      Self::MissingPalette => f.write_str("indexed image has no PLTE before IDAT"),
      Self::Decompression => f.write_str("zlib decompression failed"),
      Self::IllegalFilter(filter) => write!(f, "illegal scanline filter type {filter}"),
      Self::MissingImageData => f.write_str("IEND reached before all image data"),
      Self::OutOfMemory => f.write_str("out of memory for decoding buffers"),
      Self::Stopped => f.write_str("parsing stopped by the event receiver"),
      Self::Poisoned => f.write_str("parser already failed"),
    }
  }
}
#[cfg(feature = "std")]
impl std::error::Error for PngError {}
