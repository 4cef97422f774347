use super::*;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(PngError::IllegalIHDR),
    })
  }
}

/// Image Header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IHDR {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// if the image data is stored interlaced.
  ///
  /// please don't make new interlaced images, they're terrible.
  pub is_interlaced: bool,
}
impl IHDR {
  /// Bits used by one pixel of the stored (pre-conversion) image data.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// Bytes per line of filtered data for an image `width` pixels wide.
  ///
  /// Each line is a filter byte plus the pixel data. When pixels are less than
  /// 8 bits it's possible to end up with a partial byte on the end, so we round
  /// up.
  #[inline]
  #[must_use]
  pub const fn bytes_per_filterline(&self, width: u32) -> usize {
    1 + ((self.bits_per_pixel() * (width as usize)) + 7) / 8
  }

  /// Filtering works per byte within a pixel when pixels are more than 1 byte
  /// each, and per byte when pixels are 1 byte or less.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(&self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }
}
impl TryFrom<&[u8]> for IHDR {
  type Error = PngError;
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
          return Err(PngError::IllegalIHDR);
        }
        if *compression_method != 0 || *filter_method != 0 {
          return Err(PngError::IllegalIHDR);
        }
        Ok(Self {
          width,
          height,
          bit_depth: match *color_type {
            0 if [1, 2, 4, 8, 16].contains(bit_depth) => *bit_depth,
            2 if [8, 16].contains(bit_depth) => *bit_depth,
            3 if [1, 2, 4, 8].contains(bit_depth) => *bit_depth,
            4 if [8, 16].contains(bit_depth) => *bit_depth,
            6 if [8, 16].contains(bit_depth) => *bit_depth,
            _ => return Err(PngError::IllegalIHDR),
          },
          color_type: PngColorType::try_from(*color_type)?,
          is_interlaced: match interlace_method {
            0 => false,
            1 => true,
            _ => return Err(PngError::IllegalIHDR),
          },
        })
      }
      _ => Err(PngError::IllegalIHDR),
    }
  }
}

#[test]
fn test_ihdr_parsing() {
  let ihdr = IHDR::try_from(&[0, 0, 1, 0, 0, 0, 0, 3, 8, 6, 0, 0, 1][..]).unwrap();
  assert_eq!(ihdr.width, 256);
  assert_eq!(ihdr.height, 3);
  assert_eq!(ihdr.color_type, PngColorType::RGBA);
  assert!(ihdr.is_interlaced);
  assert_eq!(ihdr.bits_per_pixel(), 32);
  assert_eq!(ihdr.filter_chunk_size(), 4);
  assert_eq!(ihdr.bytes_per_filterline(3), 13);
  // wrong length
  assert!(IHDR::try_from(&[0, 0, 1, 0, 0, 0, 0, 3, 8, 6, 0, 0][..]).is_err());
  // zero width
  assert!(IHDR::try_from(&[0, 0, 0, 0, 0, 0, 0, 3, 8, 6, 0, 0, 0][..]).is_err());
  // RGB can't be 4 bits
  assert!(IHDR::try_from(&[0, 0, 0, 1, 0, 0, 0, 3, 4, 2, 0, 0, 0][..]).is_err());
  // unknown compression method
  assert!(IHDR::try_from(&[0, 0, 0, 1, 0, 0, 0, 3, 8, 2, 1, 0, 0][..]).is_err());
  // unknown interlace method
  assert!(IHDR::try_from(&[0, 0, 0, 1, 0, 0, 0, 3, 8, 2, 0, 0, 2][..]).is_err());
  //
  let packed = IHDR::try_from(&[0, 0, 0, 9, 0, 0, 0, 1, 2, 0, 0, 0, 0][..]).unwrap();
  assert_eq!(packed.filter_chunk_size(), 1);
  assert_eq!(packed.bytes_per_filterline(9), 1 + 3);
}
