const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      //
      k += 1;
    }
    out[n] = c;
    //
    n += 1;
  }
  out
}

/// Running CRC state for a chunk whose bytes arrive in pieces.
///
/// Start at [`Crc32::new`], `update` with the chunk type and then each piece
/// of chunk data, then `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Crc32(u32);
impl Crc32 {
  #[inline]
  pub(crate) const fn new() -> Self {
    Self(u32::MAX)
  }

  #[inline]
  pub(crate) fn update(&mut self, bytes: &[u8]) {
    let mut crc = self.0;
    for byte in bytes.iter().copied() {
      let i = (crc ^ u32::from(byte)) as u8 as usize;
      crc = CRC_TABLE[i] ^ (crc >> 8);
    }
    self.0 = crc;
  }

  #[inline]
  #[must_use]
  pub(crate) const fn finish(self) -> u32 {
    self.0 ^ u32::MAX
  }
}

/// The PNG CRC-32 of some bytes.
///
/// For a chunk, that's the CRC of the chunk type followed by the chunk data.
#[inline]
#[must_use]
pub fn png_crc(iter: impl Iterator<Item = u8>) -> u32 {
  let mut crc = Crc32::new();
  for byte in iter {
    crc.update(&[byte]);
  }
  crc.finish()
}

#[test]
fn test_png_crc() {
  // every PNG ends with this exact chunk
  assert_eq!(png_crc(b"IEND".iter().copied()), 0xAE42_6082);
  assert_eq!(png_crc(b"123456789".iter().copied()), 0xCBF4_3926);
  //
  let mut split = Crc32::new();
  split.update(b"1234");
  split.update(b"");
  split.update(b"56789");
  assert_eq!(split.finish(), 0xCBF4_3926);
}
