//! Module for pixel formats.
//!
//! There's two sides to the pixel formats in this crate:
//! * **Source:** the PNG parser always hands out [`RGBA8`] values, no matter
//!   what the PNG's own color type and bit depth were. Palette entries are
//!   stored as [`RGB8`].
//! * **Target:** display buffers use one of four "true color + alpha"
//!   encodings, picked with a [`ColorDepth`] value. Every target keeps a full
//!   8-bit alpha byte after the color bits.
//!
//! ## Reducing Depth
//!
//! All target formats reduce channel depth by keeping only the top X many bits
//! of each channel. There's no rounding and no dithering, so converting the
//! same color always gives the same bits.
//!
//! | Target | Bytes | Layout |
//! |:-|:-:|:-|
//! | [`BGRA8`] | 4 | `b, g, r, a` |
//! | [`RGB565A8`] | 3 | `rgb565` as a little-endian `u16`, then `a` |
//! | [`RGB332A8`] | 2 | `rgb332` byte, then `a` |
//! | [`Y1A8`] | 2 | `1` if any color channel has its high bit set, then `a` |

use bytemuck::{Pod, Zeroable};

/// An RGB value, 8-bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// An 8-bits per channel RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8 {
  /// Makes a pixel from `[r, g, b, a]` bytes.
  #[inline]
  #[must_use]
  pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
    Self { r, g, b, a }
  }
}
impl From<[u8; 4]> for RGBA8 {
  #[inline]
  fn from(array: [u8; 4]) -> Self {
    Self::from_array(array)
  }
}

/// 32-bit target: an 8-bits per channel pixel in `b, g, r, a` byte order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct BGRA8 {
  pub b: u8,
  pub g: u8,
  pub r: u8,
  pub a: u8,
}
impl From<RGBA8> for BGRA8 {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    Self { b, g, r, a }
  }
}

/// 16-bit target: 5-6-5 packed color plus an alpha byte.
///
/// The color is stored as a two-byte array (little-endian) to keep the type's
/// overall alignment at only 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct RGB565A8 {
  pub rgb: [u8; 2],
  pub a: u8,
}
impl RGB565A8 {
  /// The packed color as a `u16`, red in the high bits.
  #[inline]
  #[must_use]
  pub const fn rgb565(self) -> u16 {
    u16::from_le_bytes(self.rgb)
  }
}
impl From<RGBA8> for RGB565A8 {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    let word: u16 = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
    Self { rgb: word.to_le_bytes(), a }
  }
}

/// 8-bit target: 3-3-2 packed color plus an alpha byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct RGB332A8 {
  pub rgb: u8,
  pub a: u8,
}
impl From<RGBA8> for RGB332A8 {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    Self { rgb: (r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6), a }
  }
}

/// 1-bit target: a single on/off bit (in the low bit of `y`) plus an alpha
/// byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct Y1A8 {
  pub y: u8,
  pub a: u8,
}
impl From<RGBA8> for Y1A8 {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    Self { y: ((r | g | b) & 0x80) >> 7, a }
  }
}

unsafe impl Zeroable for RGB8 {}
unsafe impl Zeroable for RGBA8 {}
unsafe impl Zeroable for BGRA8 {}
unsafe impl Zeroable for RGB565A8 {}
unsafe impl Zeroable for RGB332A8 {}
unsafe impl Zeroable for Y1A8 {}
//
unsafe impl Pod for RGB8 {}
unsafe impl Pod for RGBA8 {}
unsafe impl Pod for BGRA8 {}
unsafe impl Pod for RGB565A8 {}
unsafe impl Pod for RGB332A8 {}
unsafe impl Pod for Y1A8 {}

/// The target encoding for decoded images.
///
/// Named for the color depth of the display the pixels are meant for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorDepth {
  /// [`BGRA8`]
  #[default]
  Bits32,
  /// [`RGB565A8`]
  Bits16,
  /// [`RGB332A8`]
  Bits8,
  /// [`Y1A8`]
  Bits1,
}
impl ColorDepth {
  /// Picks the depth with the given bit count (`32`, `16`, `8`, or `1`).
  #[inline]
  #[must_use]
  pub const fn from_bits(bits: u8) -> Option<Self> {
    Some(match bits {
      32 => Self::Bits32,
      16 => Self::Bits16,
      8 => Self::Bits8,
      1 => Self::Bits1,
      _ => return None,
    })
  }

  /// The color bit count of this depth.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u8 {
    match self {
      Self::Bits32 => 32,
      Self::Bits16 => 16,
      Self::Bits8 => 8,
      Self::Bits1 => 1,
    }
  }

  /// Bytes used per pixel in a buffer of this depth, alpha included.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self) -> usize {
    match self {
      Self::Bits32 => core::mem::size_of::<BGRA8>(),
      Self::Bits16 => core::mem::size_of::<RGB565A8>(),
      Self::Bits8 => core::mem::size_of::<RGB332A8>(),
      Self::Bits1 => core::mem::size_of::<Y1A8>(),
    }
  }

  /// Encodes `rgba` into the front of `out`.
  ///
  /// ## Panics
  /// * If `out` is shorter than [`bytes_per_pixel`](Self::bytes_per_pixel).
  #[inline]
  pub fn encode_into(self, rgba: RGBA8, out: &mut [u8]) {
    match self {
      Self::Bits32 => out[..4].copy_from_slice(bytemuck::bytes_of(&BGRA8::from(rgba))),
      Self::Bits16 => out[..3].copy_from_slice(bytemuck::bytes_of(&RGB565A8::from(rgba))),
      Self::Bits8 => out[..2].copy_from_slice(bytemuck::bytes_of(&RGB332A8::from(rgba))),
      Self::Bits1 => out[..2].copy_from_slice(bytemuck::bytes_of(&Y1A8::from(rgba))),
    }
  }
}
