use super::*;

/// The four byte type tag of a PNG chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl PngChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");

  /// Critical chunks have an uppercase first letter.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0b0010_0000) == 0
  }
}
impl Debug for PngChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// The 8 bytes at the start of every chunk: a big-endian length and then the
/// chunk type.
///
/// The `length` counts only the chunk's data. Each chunk also has a 4 byte CRC
/// after the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkPrefix {
  pub length: u32,
  pub type_: PngChunkType,
}
impl ChunkPrefix {
  /// PNG limits chunk lengths to what fits in a signed 32-bit value.
  pub const MAX_LENGTH: u32 = i32::MAX as u32;

  #[inline]
  #[must_use]
  pub const fn from_bytes(bytes: [u8; 8]) -> Self {
    let [l0, l1, l2, l3, t0, t1, t2, t3] = bytes;
    Self { length: u32::from_be_bytes([l0, l1, l2, l3]), type_: PngChunkType([t0, t1, t2, t3]) }
  }

  /// If the declared length is within the PNG limit.
  #[inline]
  #[must_use]
  pub const fn is_length_legal(&self) -> bool {
    self.length <= Self::MAX_LENGTH
  }

  /// Bytes in the chunk after this prefix: the data plus the CRC.
  #[inline]
  #[must_use]
  pub const fn remaining_len(&self) -> u64 {
    self.length as u64 + 4
  }
}

#[test]
fn test_chunk_prefix() {
  let p = ChunkPrefix::from_bytes([0, 0, 0, 13, b'I', b'H', b'D', b'R']);
  assert_eq!(p.length, 13);
  assert_eq!(p.type_, PngChunkType::IHDR);
  assert!(p.is_length_legal());
  assert_eq!(p.remaining_len(), 17);
  assert!(p.type_.is_critical());
  assert!(!PngChunkType::tRNS.is_critical());
  //
  let bad = ChunkPrefix::from_bytes([0x80, 0, 0, 0, b'I', b'D', b'A', b'T']);
  assert!(!bad.is_length_legal());
  assert!(ChunkPrefix::from_bytes([0x7F, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]).is_length_legal());
}
